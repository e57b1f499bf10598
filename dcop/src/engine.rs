//! Synchronous round based execution.
use std::time::{Duration, Instant};

use partial_ref::{partial, PartialRef};

use log::debug;

use dcop_instance::AgentId;

use crate::algorithm::Algorithm;
use crate::context::{ConfigP, Context, EngineP, InstanceP, RngP, StatsP};
use crate::stats::IterationStats;

/// Lifecycle of a solver run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineStatus {
    /// No round was performed since creation or the last reset.
    Initializing,
    /// Rounds are being performed.
    Running,
    /// A run completed. Further rounds resume from here.
    Finished,
}

impl Default for EngineStatus {
    fn default() -> EngineStatus {
        EngineStatus::Initializing
    }
}

/// Counters of the synchronous engine.
#[derive(Clone, Debug, Default)]
pub struct EngineState {
    pub status: EngineStatus,
    /// Number of completed rounds.
    pub iteration: u64,
    /// Number of messages sent.
    pub messages: u64,
    /// Round after which the current run terminates.
    pub iteration_target: u64,
    /// Time spent in completed phases.
    pub elapsed: Duration,
}

impl EngineState {
    /// Account for sent messages.
    pub fn count_messages(&mut self, count: usize) {
        self.messages += count as u64;
    }

    pub fn termination_condition(&self) -> bool {
        self.iteration >= self.iteration_target
    }
}

#[derive(Copy, Clone)]
enum Phase {
    Start,
    CycleStart,
    CurrentCycle,
    CycleEnd,
    Termination,
}

/// Invoke a phase for every agent.
fn run_phase(
    mut ctx: partial!(Context, mut EngineP, mut InstanceP, mut RngP, ConfigP),
    algorithm: &mut dyn Algorithm,
    phase: Phase,
) {
    let agent_count = ctx.part(InstanceP).agents().len();
    for index in 0..agent_count {
        let agent = AgentId::from_index(index);
        match phase {
            Phase::Start => algorithm.on_start(ctx.borrow(), agent),
            Phase::CycleStart => algorithm.on_cycle_start(ctx.borrow(), agent),
            Phase::CurrentCycle => algorithm.on_current_cycle(ctx.borrow(), agent),
            Phase::CycleEnd => algorithm.on_cycle_end(ctx.borrow(), agent),
            Phase::Termination => algorithm.on_termination(ctx.borrow(), agent),
        }
    }
}

/// Append statistics for the current state.
fn record_stats(
    mut ctx: partial!(Context, mut StatsP, EngineP, InstanceP),
    algorithm: &dyn Algorithm,
) {
    let (stats, ctx) = ctx.split_part_mut(StatsP);
    let engine = ctx.part(EngineP);
    stats.record(IterationStats {
        algorithm: algorithm.name(),
        iteration: engine.iteration,
        messages: engine.messages,
        elapsed: engine.elapsed,
        cost: ctx.part(InstanceP).cost(),
    });
}

/// Perform `rounds` rounds of an algorithm.
///
/// A fresh engine first starts all agents and records statistics for iteration 0. A finished
/// engine resumes, continuing its counters and statistics. Every run ends by terminating all
/// agents.
pub fn run(
    mut ctx: partial!(Context, mut EngineP, mut InstanceP, mut RngP, mut StatsP, ConfigP),
    algorithm: &mut dyn Algorithm,
    rounds: u64,
) {
    let started = Instant::now();
    let elapsed_before = ctx.part(EngineP).elapsed;

    if ctx.part(EngineP).status == EngineStatus::Initializing {
        run_phase(ctx.borrow(), algorithm, Phase::Start);
        ctx.part_mut(EngineP).elapsed = elapsed_before + started.elapsed();
        record_stats(ctx.borrow(), algorithm);
    }

    {
        let engine = ctx.part_mut(EngineP);
        engine.status = EngineStatus::Running;
        engine.iteration_target = engine.iteration + rounds;
    }

    while !ctx.part(EngineP).termination_condition() {
        run_phase(ctx.borrow(), algorithm, Phase::CycleStart);
        run_phase(ctx.borrow(), algorithm, Phase::CurrentCycle);
        run_phase(ctx.borrow(), algorithm, Phase::CycleEnd);

        let engine = ctx.part_mut(EngineP);
        engine.iteration += 1;
        engine.elapsed = elapsed_before + started.elapsed();

        record_stats(ctx.borrow(), algorithm);

        if let Some(last) = ctx.part(StatsP).last() {
            debug!(
                "{} round {}: {} messages, cost {:?}",
                last.algorithm, last.iteration, last.messages, last.cost
            );
        }
    }

    run_phase(ctx.borrow(), algorithm, Phase::Termination);

    let engine = ctx.part_mut(EngineP);
    engine.elapsed = elapsed_before + started.elapsed();
    engine.status = EngineStatus::Finished;
}
