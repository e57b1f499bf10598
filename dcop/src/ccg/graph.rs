//! Weighted conflict graph over Boolean nodes.
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use dcop_instance::{Cost, Instance, VarId};
use dcop_wcsp::ReducedGraph;

use super::reduce::ReductionError;

macro_rules! define_index {
    ($name:ident, $prefix:expr) => {
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            pub fn from_index(index: usize) -> $name {
                debug_assert!(index <= u32::max_value() as usize);
                $name(index as u32)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

define_index!(NodeIndex, "n");
define_index!(EdgeIndex, "e");

/// Role of a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Encodes part of the value of a variable.
    ///
    /// Boolean variables have a single node of rank 0. A variable with a domain of `k > 2` values
    /// has nodes of rank `1..k`.
    Decision { variable: VarId, rank: usize },
    /// Introduced by the reduction.
    Auxiliary,
}

#[derive(Clone, Debug)]
pub struct CcgNode {
    /// Vertex id used by the reduction tool.
    pub vertex: usize,
    /// Cost of including the node in the cover.
    pub weight: Cost,
    pub kind: NodeKind,
}

/// Edges forbid leaving both endpoints out of the cover.
#[derive(Clone, Debug)]
pub struct CcgEdge {
    pub nodes: [NodeIndex; 2],
    /// Penalty for leaving the edge uncovered.
    pub weight: Cost,
}

impl CcgEdge {
    /// The endpoint opposite to `node`.
    pub fn other(&self, node: NodeIndex) -> NodeIndex {
        if self.nodes[0] == node {
            self.nodes[1]
        } else {
            self.nodes[0]
        }
    }
}

/// Constraint composite graph of an instance.
#[derive(Clone, Debug, Default)]
pub struct CcgGraph {
    nodes: Vec<CcgNode>,
    edges: Vec<CcgEdge>,
    adjacency: Vec<Vec<(NodeIndex, EdgeIndex)>>,
    /// Decision nodes of each variable ordered by rank.
    variable_nodes: Vec<Vec<NodeIndex>>,
}

impl CcgGraph {
    /// Build the graph from the output of the reduction.
    ///
    /// Duplicate edges are merged and self loops dropped.
    pub fn from_reduction(
        instance: &Instance,
        reduced: &ReducedGraph,
    ) -> Result<CcgGraph, ReductionError> {
        let mut graph = CcgGraph::default();
        let mut vertex_nodes = FxHashMap::default();

        for &(vertex, weight) in reduced.vertices.iter() {
            let node = NodeIndex::from_index(graph.nodes.len());
            if vertex_nodes.insert(vertex, node).is_some() {
                return Err(ReductionError::DuplicateVertex { vertex });
            }
            graph.nodes.push(CcgNode {
                vertex,
                weight,
                kind: NodeKind::Auxiliary,
            });
            graph.adjacency.push(vec![]);
        }

        let lookup = |vertex: usize| {
            vertex_nodes
                .get(&vertex)
                .cloned()
                .ok_or(ReductionError::UnknownVertex { vertex })
        };

        let mut seen = FxHashSet::default();
        for &(a, b) in reduced.edges.iter() {
            let (a, b) = (lookup(a)?, lookup(b)?);
            if a == b || !seen.insert((a.min(b), a.max(b))) {
                continue;
            }
            let edge = EdgeIndex::from_index(graph.edges.len());
            graph.edges.push(CcgEdge {
                nodes: [a, b],
                weight: 1.0,
            });
            graph.adjacency[a.index()].push((b, edge));
            graph.adjacency[b.index()].push((a, edge));
        }

        let mut boolean_nodes = FxHashMap::default();
        for &(vertex, boolean) in reduced.vertex_types.iter() {
            let node = lookup(vertex)?;
            if let Some(boolean) = boolean {
                boolean_nodes.insert(boolean, node);
            }
        }

        graph.variable_nodes = vec![vec![]; instance.variables().len()];
        for (variable, booleans) in reduced.variable_nodes.iter() {
            let nodes = graph
                .variable_nodes
                .get_mut(*variable)
                .ok_or(ReductionError::UnknownVariable {
                    variable: *variable,
                })?;
            for boolean in booleans.iter() {
                let node = boolean_nodes
                    .get(boolean)
                    .cloned()
                    .ok_or(ReductionError::UnknownNode { node: *boolean })?;
                nodes.push(node);
            }
        }

        for var in instance.var_ids() {
            let nodes = &graph.variable_nodes[var.index()];
            let expected = instance.variable(var).domain_size().saturating_sub(1);
            if nodes.len() != expected {
                return Err(ReductionError::NodeCount {
                    variable: instance.variable(var).name().to_owned(),
                    count: nodes.len(),
                    expected,
                });
            }
            for (position, &node) in nodes.iter().enumerate() {
                let rank = if nodes.len() == 1 { 0 } else { position + 1 };
                let kind = &mut graph.nodes[node.index()].kind;
                if *kind != NodeKind::Auxiliary {
                    return Err(ReductionError::SharedVertex {
                        vertex: graph.nodes[node.index()].vertex,
                    });
                }
                *kind = NodeKind::Decision {
                    variable: var,
                    rank,
                };
            }
        }

        Ok(graph)
    }

    pub fn nodes(&self) -> &[CcgNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[CcgEdge] {
        &self.edges
    }

    pub fn node(&self, node: NodeIndex) -> &CcgNode {
        &self.nodes[node.index()]
    }

    pub fn edge(&self, edge: EdgeIndex) -> &CcgEdge {
        &self.edges[edge.index()]
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex::from_index)
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> {
        (0..self.edges.len()).map(EdgeIndex::from_index)
    }

    /// Adjacent nodes with the connecting edges.
    pub fn neighbors(&self, node: NodeIndex) -> &[(NodeIndex, EdgeIndex)] {
        &self.adjacency[node.index()]
    }

    /// Decision nodes of a variable ordered by rank.
    pub fn variable_nodes(&self, var: VarId) -> &[NodeIndex] {
        &self.variable_nodes[var.index()]
    }

    /// Summed weight of the nodes in a cover.
    pub fn cover_weight(&self, cover: &[bool]) -> Cost {
        self.nodes
            .iter()
            .zip(cover)
            .filter(|&(_, &included)| included)
            .map(|(node, _)| node.weight)
            .sum()
    }

    /// Whether every edge has an endpoint in the cover.
    pub fn is_cover(&self, cover: &[bool]) -> bool {
        self.edges
            .iter()
            .all(|edge| edge.nodes.iter().any(|node| cover[node.index()]))
    }

    /// Domain position of a variable encoded by a cover.
    ///
    /// A Boolean variable takes position 1 when its node is in the cover. Otherwise the variable
    /// takes the lowest rank absent from the cover, or position 0 if all ranks are present. The
    /// second component tells whether more than one rank was absent.
    pub fn decode_variable(&self, var: VarId, cover: &[bool]) -> (usize, bool) {
        let nodes = &self.variable_nodes[var.index()];
        if nodes.len() == 1 {
            return (cover[nodes[0].index()] as usize, false);
        }
        let mut absent = nodes
            .iter()
            .enumerate()
            .filter(|&(_, node)| !cover[node.index()])
            .map(|(position, _)| position + 1);
        match absent.next() {
            Some(rank) => (rank, absent.next().is_some()),
            None => (0, false),
        }
    }
}
