//! Central solver data structure.
use partial_ref::{part, PartialRefTarget};

use dcop_instance::Instance;

use crate::config::SolverConfig;
use crate::engine::EngineState;
use crate::rng::SolverRng;
use crate::stats::Stats;

/// Part declarations for the [`Context`] struct.
mod parts {
    use super::*;

    part!(pub ConfigP: SolverConfig);
    part!(pub EngineP: EngineState);
    part!(pub InstanceP: Instance);
    part!(pub RngP: SolverRng);
    part!(pub StatsP: Stats);
}

pub use parts::*;

/// Central solver data structure.
///
/// This struct contains all data shared by the agents of a solver. Algorithm specific state is
/// kept by the algorithms themselves. Functions operating on multiple fields of the context use
/// partial references provided by the `partial_ref` crate.
#[derive(PartialRefTarget, Default)]
pub struct Context {
    #[part(ConfigP)]
    pub config: SolverConfig,
    #[part(EngineP)]
    pub engine: EngineState,
    #[part(InstanceP)]
    pub instance: Instance,
    #[part(RngP)]
    pub rng: SolverRng,
    #[part(StatsP)]
    pub stats: Stats,
}
