//! Uniformly random assignments as a baseline.
use partial_ref::PartialRef;

use dcop_instance::AgentId;

use crate::algorithm::{assign_random, Algorithm, AgentCtx};

/// Reassigns every variable uniformly at random each round.
#[derive(Default)]
pub struct RandomAssignment;

impl Algorithm for RandomAssignment {
    fn name(&self) -> &'static str {
        "rand"
    }

    fn on_start(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        assign_random(ctx.borrow(), agent);
    }

    fn on_cycle_end(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        assign_random(ctx.borrow(), agent);
    }

    fn reset(&mut self) {}
}
