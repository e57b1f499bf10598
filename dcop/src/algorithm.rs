//! Phase driven interface implemented by all solving algorithms.
use std::fmt;
use std::str::FromStr;

use partial_ref::{partial, PartialRef};
use rand::Rng;
use thiserror::Error;

use dcop_instance::AgentId;

use crate::context::{ConfigP, Context, EngineP, InstanceP, RngP};

/// Context available to an agent during a phase.
pub type AgentCtx<'a> = partial!('a Context, mut EngineP, mut InstanceP, mut RngP, ConfigP);

/// A solving algorithm driven by the synchronous engine.
///
/// The engine calls each phase for every agent in ascending [`AgentId`] order, and a phase is
/// finished for all agents before the next phase starts. Implementations must not depend on the
/// order of agents within a phase.
pub trait Algorithm {
    /// Name used in statistics.
    fn name(&self) -> &'static str;

    /// Called once per agent before the first round.
    fn on_start(&mut self, _ctx: AgentCtx, _agent: AgentId) {}

    /// First phase of a round.
    fn on_cycle_start(&mut self, _ctx: AgentCtx, _agent: AgentId) {}

    /// Second phase of a round.
    fn on_current_cycle(&mut self, _ctx: AgentCtx, _agent: AgentId) {}

    /// Last phase of a round.
    fn on_cycle_end(&mut self, _ctx: AgentCtx, _agent: AgentId) {}

    /// Called once per agent after the last round of a run.
    fn on_termination(&mut self, _ctx: AgentCtx, _agent: AgentId) {}

    /// Forget all state accumulated while running.
    fn reset(&mut self);

    /// Number of variables that were decoded from an ambiguous cover.
    fn decode_ambiguities(&self) -> u64 {
        0
    }
}

/// Assign uniformly random values to all variables of an agent.
pub fn assign_random(mut ctx: partial!(Context, mut InstanceP, mut RngP), agent: AgentId) {
    let (instance, mut ctx) = ctx.split_part_mut(InstanceP);
    let rng = ctx.part_mut(RngP);
    for index in 0..instance.agent(agent).variables().len() {
        let var = instance.agent(agent).variables()[index];
        let domain_size = instance.variable(var).domain_size();
        instance.assign(var, rng.gen_range(0, domain_size));
    }
}

/// Available algorithms.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    /// Distributed stochastic local search over the variables.
    Dsa,
    /// Max-Sum on the factor graph of the instance.
    MaxSum,
    /// Max-Sum over the constraint composite graph, each agent updating its gadget.
    CcgMaxSum,
    /// Max-Sum over the constraint composite graph, computed by the root agent.
    CcgMaxSumCentralized,
    /// Distributed stochastic local search over the constraint composite graph.
    CcgDsa,
    /// Uniformly random assignments.
    Random,
}

impl AlgorithmKind {
    /// All algorithms.
    pub const ALL: [AlgorithmKind; 6] = [
        AlgorithmKind::Dsa,
        AlgorithmKind::MaxSum,
        AlgorithmKind::CcgMaxSum,
        AlgorithmKind::CcgMaxSumCentralized,
        AlgorithmKind::CcgDsa,
        AlgorithmKind::Random,
    ];

    /// Name used on the command line and in statistics.
    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::Dsa => "dsa",
            AlgorithmKind::MaxSum => "maxsum",
            AlgorithmKind::CcgMaxSum => "ccg-maxsum",
            AlgorithmKind::CcgMaxSumCentralized => "ccg-maxsum-c",
            AlgorithmKind::CcgDsa => "ccg-dsa",
            AlgorithmKind::Random => "rand",
        }
    }

    /// Whether the algorithm operates on the constraint composite graph.
    pub fn uses_ccg(self) -> bool {
        match self {
            AlgorithmKind::CcgMaxSum
            | AlgorithmKind::CcgMaxSumCentralized
            | AlgorithmKind::CcgDsa => true,
            AlgorithmKind::Dsa | AlgorithmKind::MaxSum | AlgorithmKind::Random => false,
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("unknown algorithm '{}'", name)]
pub struct UnknownAlgorithm {
    pub name: String,
}

impl FromStr for AlgorithmKind {
    type Err = UnknownAlgorithm;

    fn from_str(name: &str) -> Result<AlgorithmKind, UnknownAlgorithm> {
        AlgorithmKind::ALL
            .iter()
            .cloned()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownAlgorithm {
                name: name.to_owned(),
            })
    }
}
