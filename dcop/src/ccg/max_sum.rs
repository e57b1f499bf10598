//! Max-Sum on the constraint composite graph.
use log::debug;
use partial_ref::{partial, PartialRef};
use rustc_hash::FxHashMap;

use dcop_instance::{AgentId, Instance, VarId};

use crate::algorithm::{assign_random, Algorithm, AgentCtx};
use crate::context::{ConfigP, Context, EngineP, InstanceP, RngP};
use crate::messages::{damp, normalize, perturb};

use super::gadgets::Gadgets;
use super::graph::{CcgGraph, NodeIndex};

/// Which agents perform the computation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// The first agent updates all nodes and decodes all variables.
    Centralized,
    /// Each agent updates the nodes of its gadget and decodes its own variables.
    Distributed,
}

/// Messages indexed by sender and receiver, holding the cost for the receiver being out of or in
/// the cover.
type Messages = FxHashMap<(NodeIndex, NodeIndex), [f64; 2]>;

/// Min-sum message passing for minimum weight vertex cover.
pub struct CcgMaxSum {
    mode: Mode,
    graph: CcgGraph,
    gadgets: Gadgets,
    messages: Messages,
    previous: Messages,
    cover: Vec<bool>,
    ambiguities: u64,
}

impl CcgMaxSum {
    pub fn new(mode: Mode, graph: CcgGraph, gadgets: Gadgets) -> CcgMaxSum {
        let mut messages = Messages::default();
        for edge in graph.edges() {
            let [a, b] = edge.nodes;
            messages.insert((a, b), [0.0; 2]);
            messages.insert((b, a), [0.0; 2]);
        }
        CcgMaxSum {
            mode,
            cover: vec![false; graph.nodes().len()],
            graph,
            gadgets,
            previous: messages.clone(),
            messages,
            ambiguities: 0,
        }
    }

    pub fn graph(&self) -> &CcgGraph {
        &self.graph
    }

    /// Current cover of all nodes.
    pub fn cover(&self) -> &[bool] {
        &self.cover
    }

    /// Nodes updated by an agent.
    fn agent_nodes(&self, agent: AgentId) -> Vec<NodeIndex> {
        match self.mode {
            Mode::Centralized if agent.index() == 0 => self.graph.node_indices().collect(),
            Mode::Centralized => vec![],
            Mode::Distributed => self.gadgets.gadget(agent).nodes.clone(),
        }
    }

    /// Variables decoded by an agent.
    fn agent_variables(&self, instance: &Instance, agent: AgentId) -> Vec<VarId> {
        match self.mode {
            Mode::Centralized if agent.index() == 0 => instance.var_ids().collect(),
            Mode::Centralized => vec![],
            Mode::Distributed => instance.agent(agent).variables().to_vec(),
        }
    }

    /// Sum of incoming messages from the given buffer.
    fn incoming(&self, messages: &Messages, node: NodeIndex) -> [f64; 2] {
        let mut sum = [0.0; 2];
        for &(neighbor, _) in self.graph.neighbors(node) {
            if let Some(message) = messages.get(&(neighbor, node)) {
                sum[0] += message[0];
                sum[1] += message[1];
            }
        }
        sum
    }

    fn update_nodes(
        &mut self,
        mut ctx: partial!(Context, mut RngP, ConfigP),
        nodes: &[NodeIndex],
    ) -> usize {
        let (config, mut ctx) = ctx.split_part(ConfigP);
        let mut sent = 0;

        for &node in nodes {
            let weight = self.graph.node(node).weight;
            let total = self.incoming(&self.previous, node);

            for &(neighbor, _) in self.graph.neighbors(node) {
                let from_neighbor = self
                    .previous
                    .get(&(neighbor, node))
                    .cloned()
                    .unwrap_or([0.0; 2]);
                let rest = [total[0] - from_neighbor[0], total[1] - from_neighbor[1]];

                let mut message = [weight + rest[1], rest[0].min(rest[1] + weight)];
                normalize(&mut message);
                perturb(&mut message, config.noise_scale, ctx.part_mut(RngP));
                let previous = self
                    .previous
                    .get(&(node, neighbor))
                    .cloned()
                    .unwrap_or([0.0; 2]);
                damp(&mut message, &previous, config.damping);

                self.messages.insert((node, neighbor), message);
                sent += 1;
            }
        }

        sent
    }

    fn decode(&mut self, mut ctx: partial!(Context, mut InstanceP), agent: AgentId) {
        for node in self.agent_nodes(agent) {
            let total = self.incoming(&self.messages, node);
            self.cover[node.index()] = total[0] > total[1] + self.graph.node(node).weight;
        }

        let variables = self.agent_variables(ctx.part(InstanceP), agent);
        let instance = ctx.part_mut(InstanceP);
        for var in variables {
            let (position, ambiguous) = self.graph.decode_variable(var, &self.cover);
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

impl Algorithm for CcgMaxSum {
    fn name(&self) -> &'static str {
        match self.mode {
            Mode::Centralized => "ccg-maxsum-c",
            Mode::Distributed => "ccg-maxsum",
        }
    }

    fn on_start(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        assign_random(ctx.borrow(), agent);
    }

    fn on_cycle_start(&mut self, _ctx: AgentCtx, agent: AgentId) {
        for node in self.agent_nodes(agent) {
            for &(neighbor, _) in self.graph.neighbors(node) {
                let key = (node, neighbor);
                if let Some(&message) = self.messages.get(&key) {
                    self.previous.insert(key, message);
                }
            }
        }
    }

    fn on_current_cycle(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        let nodes = self.agent_nodes(agent);
        let sent = self.update_nodes(ctx.borrow(), &nodes);
        ctx.part_mut(EngineP).count_messages(sent);
    }

    fn on_cycle_end(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        self.decode(ctx.borrow(), agent);
    }

    fn reset(&mut self) {
        for message in self.messages.values_mut().chain(self.previous.values_mut()) {
            *message = [0.0; 2];
        }
        for included in self.cover.iter_mut() {
            *included = false;
        }
        self.ambiguities = 0;
    }

    fn decode_ambiguities(&self) -> u64 {
        self.ambiguities
    }
}
