//! DSA on the constraint composite graph.
use log::debug;
use partial_ref::{partial, PartialRef};
use rand::Rng;

use dcop_instance::{AgentId, Cost};

use crate::algorithm::{Algorithm, AgentCtx};
use crate::context::{ConfigP, Context, EngineP, InstanceP, RngP};
use crate::dsa::should_switch;

use super::gadgets::Gadgets;
use super::graph::{CcgGraph, NodeIndex};

/// Local search over the nodes of each gadget.
///
/// A node value of `true` puts the node into the cover. Leaving both endpoints of an edge out of
/// the cover costs the edge's weight.
pub struct CcgDsa {
    graph: CcgGraph,
    gadgets: Gadgets,
    values: Vec<bool>,
    /// Node values as published at the start of the round.
    view: Vec<bool>,
    ambiguities: u64,
}

impl CcgDsa {
    pub fn new(graph: CcgGraph, gadgets: Gadgets) -> CcgDsa {
        let node_count = graph.nodes().len();
        CcgDsa {
            graph,
            gadgets,
            values: vec![false; node_count],
            view: vec![false; node_count],
            ambiguities: 0,
        }
    }

    /// Current node values.
    pub fn values(&self) -> &[bool] {
        &self.values
    }

    /// Local cost of giving a node a value, given the published values of its neighbors.
    fn node_cost(&self, node: NodeIndex, value: bool) -> Cost {
        let mut cost = if value {
            self.graph.node(node).weight
        } else {
            0.0
        };
        for &(neighbor, edge) in self.graph.neighbors(node) {
            if self.view[neighbor.index()] {
                cost += self.graph.node(neighbor).weight;
            } else if !value {
                cost += self.graph.edge(edge).weight;
            }
        }
        cost
    }

    /// Whether a node leaves an incident edge uncovered.
    fn conflicted(&self, node: NodeIndex) -> bool {
        !self.view[node.index()]
            && self
                .graph
                .neighbors(node)
                .iter()
                .any(|&(neighbor, _)| !self.view[neighbor.index()])
    }

    fn decode(&mut self, mut ctx: partial!(Context, mut InstanceP), agent: AgentId) {
        let instance = ctx.part_mut(InstanceP);
        for index in 0..instance.agent(agent).variables().len() {
            let var = instance.agent(agent).variables()[index];
            let (position, ambiguous) = self.graph.decode_variable(var, &self.values);
            if ambiguous {
                debug!(
                    "Ambiguous cover for variable {}, using position {}",
                    instance.variable(var).name(),
                    position
                );
                self.ambiguities += 1;
            }
            instance.assign(var, position);
        }
    }
}

impl Algorithm for CcgDsa {
    fn name(&self) -> &'static str {
        "ccg-dsa"
    }

    fn on_start(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        {
            let rng = ctx.part_mut(RngP);
            for &node in self.gadgets.gadget(agent).nodes.iter() {
                self.values[node.index()] = rng.gen();
            }
        }
        self.decode(ctx.borrow(), agent);
    }

    fn on_cycle_start(&mut self, _ctx: AgentCtx, agent: AgentId) {
        for &node in self.gadgets.gadget(agent).nodes.iter() {
            self.view[node.index()] = self.values[node.index()];
        }
    }

    fn on_current_cycle(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        let (config, mut ctx) = ctx.split_part(ConfigP);
        let gadget = self.gadgets.gadget(agent);
        ctx.part_mut(EngineP).count_messages(gadget.boundary.len());

        let mut flips = vec![];
        for &node in gadget.nodes.iter() {
            let current = self.view[node.index()];
            let delta = self.node_cost(node, current) - self.node_cost(node, !current);
            if should_switch(
                config.dsa_variant,
                delta,
                self.conflicted(node),
                config.dsa_probability,
                ctx.part_mut(RngP),
            ) {
                flips.push(node);
            }
        }

        for node in flips {
            self.values[node.index()] = !self.view[node.index()];
        }
    }

    fn on_cycle_end(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        self.decode(ctx.borrow(), agent);
    }

    fn reset(&mut self) {
        for value in self.values.iter_mut().chain(self.view.iter_mut()) {
            *value = false;
        }
        self.ambiguities = 0;
    }

    fn decode_ambiguities(&self) -> u64 {
        self.ambiguities
    }
}
