//! Synchronous solvers for distributed constraint optimization problems.
//!
//! A problem [`Instance`] is solved by simulating its agents in lock step. Each round every agent
//! passes through three phases, exchanging information only through state published in earlier
//! phases. Supported algorithms are Max-Sum, DSA and their counterparts on the constraint
//! composite graph of the instance, see [`AlgorithmKind`].

pub mod algorithm;
pub mod ccg;
pub mod config;
pub mod dsa;
pub mod max_sum;
pub mod random;
pub mod solver;
pub mod stats;

mod context;
mod engine;
mod messages;
mod rng;

pub use algorithm::AlgorithmKind;
pub use config::{DsaVariant, SolverConfig, SolverConfigUpdate};
pub use dcop_instance::{AgentId, ConstraintId, Cost, Instance, InstanceBuilder, Value, VarId};
pub use engine::EngineStatus;
pub use solver::{Solver, SolverError};
pub use stats::{IterationStats, Stats};

pub mod instance {
    //! Problem instances.
    pub use dcop_instance::*;
}

pub mod wcsp {
    //! Text formats of the graph reduction.
    pub use dcop_wcsp::*;
}
