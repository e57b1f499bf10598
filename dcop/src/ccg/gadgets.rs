//! Partition of the constraint composite graph among agents.
use std::collections::VecDeque;

use thiserror::Error;

use dcop_instance::{AgentId, Instance};

use super::graph::{CcgGraph, EdgeIndex, NodeIndex, NodeKind};

/// Part of the graph maintained by a single agent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gadget {
    pub nodes: Vec<NodeIndex>,
    pub edges: Vec<EdgeIndex>,
    /// Endpoints of owned edges that belong to other agents.
    pub boundary: Vec<NodeIndex>,
}

/// Violated partition invariant.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("node {} belongs to {} gadgets", node, count)]
    Node { node: NodeIndex, count: usize },
    #[error("edge {} belongs to {} gadgets", edge, count)]
    Edge { edge: EdgeIndex, count: usize },
}

/// Gadgets of all agents, indexed by [`AgentId`].
#[derive(Clone, Debug, Default)]
pub struct Gadgets {
    gadgets: Vec<Gadget>,
    owners: Vec<Option<AgentId>>,
}

impl Gadgets {
    /// Distribute the nodes and edges of a graph among the agents of an instance.
    ///
    /// Agents claim the decision nodes of their variables and then, breadth first, the unclaimed
    /// auxiliary nodes reachable from those through auxiliary nodes. Remaining nodes go to the
    /// first agent. An edge goes to the first agent owning one of its endpoints.
    pub fn partition(instance: &Instance, graph: &CcgGraph) -> Result<Gadgets, PartitionError> {
        let mut gadgets = Gadgets {
            gadgets: vec![Gadget::default(); instance.agents().len()],
            owners: vec![None; graph.nodes().len()],
        };

        let mut queue = VecDeque::new();
        for agent in instance.agent_ids() {
            for &var in instance.agent(agent).variables() {
                for &node in graph.variable_nodes(var) {
                    if gadgets.claim(node, agent) {
                        queue.push_back(node);
                    }
                }
            }

            while let Some(node) = queue.pop_front() {
                for &(neighbor, _) in graph.neighbors(node) {
                    if graph.node(neighbor).kind == NodeKind::Auxiliary
                        && gadgets.claim(neighbor, agent)
                    {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        if !gadgets.gadgets.is_empty() {
            let root = AgentId::from_index(0);
            for node in graph.node_indices() {
                gadgets.claim(node, root);
            }
        }

        for edge in graph.edge_indices() {
            let nodes = graph.edge(edge).nodes;
            let owners = [gadgets.owner(nodes[0]), gadgets.owner(nodes[1])];
            let owner = match (owners[0], owners[1]) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => continue,
            };
            let gadget = &mut gadgets.gadgets[owner.index()];
            gadget.edges.push(edge);
            for (&node, &node_owner) in nodes.iter().zip(owners.iter()) {
                if node_owner != Some(owner) {
                    gadget.boundary.push(node);
                }
            }
        }

        for gadget in gadgets.gadgets.iter_mut() {
            gadget.boundary.sort();
            gadget.boundary.dedup();
        }

        gadgets.check(graph)?;

        Ok(gadgets)
    }

    fn claim(&mut self, node: NodeIndex, agent: AgentId) -> bool {
        let owner = &mut self.owners[node.index()];
        if owner.is_some() {
            return false;
        }
        *owner = Some(agent);
        self.gadgets[agent.index()].nodes.push(node);
        true
    }

    /// Verify that nodes and edges are partitioned.
    fn check(&self, graph: &CcgGraph) -> Result<(), PartitionError> {
        let mut node_counts = vec![0; graph.nodes().len()];
        let mut edge_counts = vec![0; graph.edges().len()];
        for gadget in self.gadgets.iter() {
            for &node in gadget.nodes.iter() {
                node_counts[node.index()] += 1;
            }
            for &edge in gadget.edges.iter() {
                edge_counts[edge.index()] += 1;
            }
        }

        for (index, &count) in node_counts.iter().enumerate() {
            if count != 1 {
                return Err(PartitionError::Node {
                    node: NodeIndex::from_index(index),
                    count,
                });
            }
        }
        for (index, &count) in edge_counts.iter().enumerate() {
            if count != 1 {
                return Err(PartitionError::Edge {
                    edge: EdgeIndex::from_index(index),
                    count,
                });
            }
        }
        Ok(())
    }

    pub fn gadget(&self, agent: AgentId) -> &Gadget {
        &self.gadgets[agent.index()]
    }

    pub fn gadgets(&self) -> &[Gadget] {
        &self.gadgets
    }

    /// Agent maintaining a node.
    pub fn owner(&self, node: NodeIndex) -> Option<AgentId> {
        self.owners[node.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use dcop_instance::InstanceBuilder;
    use dcop_wcsp::ReducedGraph;

    #[test]
    fn partition_chain() {
        let mut builder = InstanceBuilder::new();
        builder
            .agent("b")
            .agent("a")
            .variable("x", vec![0, 1], "b")
            .variable("y", vec![0, 1], "a");
        let instance = builder.build().unwrap();

        // x - aux - aux - y, plus an isolated auxiliary node
        let reduced = ReducedGraph {
            vertices: vec![(1, 1.0), (2, 0.0), (3, 0.0), (4, 1.0), (5, 0.0)],
            edges: vec![(1, 2), (2, 3), (3, 4)],
            variable_nodes: vec![(0, vec![0]), (1, vec![1])],
            vertex_types: vec![(1, Some(0)), (4, Some(1)), (2, None), (3, None), (5, None)],
        };
        let graph = CcgGraph::from_reduction(&instance, &reduced).unwrap();
        let gadgets = Gadgets::partition(&instance, &graph).unwrap();

        let n = NodeIndex::from_index;
        let e = EdgeIndex::from_index;

        // "a" sorts first and owns y
        let a = instance.agent_by_name("a").unwrap();
        let b = instance.agent_by_name("b").unwrap();
        assert_eq!(a.index(), 0);

        assert_eq!(gadgets.gadget(a).nodes, vec![n(3), n(2), n(1), n(4)]);
        assert_eq!(gadgets.gadget(a).edges, vec![e(0), e(1), e(2)]);
        assert_eq!(gadgets.gadget(a).boundary, vec![n(0)]);

        assert_eq!(gadgets.gadget(b).nodes, vec![n(0)]);
        assert!(gadgets.gadget(b).edges.is_empty());
        assert!(gadgets.gadget(b).boundary.is_empty());

        assert_eq!(gadgets.owner(n(4)), Some(a));
        assert_eq!(gadgets.owner(n(0)), Some(b));
    }
}
