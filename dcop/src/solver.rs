//! Distributed constraint optimization solver.
use partial_ref::{IntoPartialRefMut, PartialRef};

use log::info;
use thiserror::Error;

use dcop_instance::{Cost, Instance};

use crate::algorithm::{Algorithm, AlgorithmKind};
use crate::ccg::{
    reduce, CcgDsa, CcgGraph, CcgMaxSum, ExternalOracle, Gadgets, Mode, PartitionError,
    ReductionError, ReductionOracle,
};
use crate::config::{SolverConfig, SolverConfigUpdate};
use crate::context::Context;
use crate::dsa::Dsa;
use crate::engine::{self, EngineState, EngineStatus};
use crate::max_sum::MaxSum;
use crate::random::RandomAssignment;
use crate::stats::Stats;

/// Failure to set up a solver.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("{}", source)]
    Reduction {
        #[from]
        source: ReductionError,
    },
    #[error("{}", source)]
    Partition {
        #[from]
        source: PartitionError,
    },
}

fn reduce_and_partition(
    instance: &Instance,
    config: &SolverConfig,
    oracle: &dyn ReductionOracle,
) -> Result<(CcgGraph, Gadgets), SolverError> {
    let graph = reduce(instance, config.big_m, oracle)?;
    let gadgets = Gadgets::partition(instance, &graph)?;
    Ok((graph, gadgets))
}

/// Runs one algorithm on an instance.
///
/// All agents are simulated in a single thread. Results are reproducible for a given seed.
pub struct Solver {
    ctx: Box<Context>,
    algorithm: Box<dyn Algorithm>,
}

impl Solver {
    /// Create a solver, running the configured reduction tool for graph based algorithms.
    pub fn new(
        instance: Instance,
        kind: AlgorithmKind,
        config: SolverConfig,
    ) -> Result<Solver, SolverError> {
        let oracle = ExternalOracle::from_config(&config);
        Solver::with_oracle(instance, kind, config, &oracle)
    }

    /// Create a solver using the given reduction for graph based algorithms.
    pub fn with_oracle(
        instance: Instance,
        kind: AlgorithmKind,
        config: SolverConfig,
        oracle: &dyn ReductionOracle,
    ) -> Result<Solver, SolverError> {
        info!(
            "Solving {} variables, {} constraints and {} agents using {}",
            instance.variables().len(),
            instance.constraints().len(),
            instance.agents().len(),
            kind
        );

        let algorithm: Box<dyn Algorithm> = match kind {
            AlgorithmKind::Dsa => Box::new(Dsa::new(&instance)),
            AlgorithmKind::MaxSum => Box::new(MaxSum::new(&instance)),
            AlgorithmKind::Random => Box::new(RandomAssignment),
            AlgorithmKind::CcgMaxSum => {
                let (graph, gadgets) = reduce_and_partition(&instance, &config, oracle)?;
                Box::new(CcgMaxSum::new(Mode::Distributed, graph, gadgets))
            }
            AlgorithmKind::CcgMaxSumCentralized => {
                let (graph, gadgets) = reduce_and_partition(&instance, &config, oracle)?;
                Box::new(CcgMaxSum::new(Mode::Centralized, graph, gadgets))
            }
            AlgorithmKind::CcgDsa => {
                let (graph, gadgets) = reduce_and_partition(&instance, &config, oracle)?;
                Box::new(CcgDsa::new(graph, gadgets))
            }
        };

        let mut ctx = Box::new(Context::default());
        ctx.rng.reseed(config.seed);
        ctx.config = config;
        ctx.instance = instance;

        Ok(Solver { ctx, algorithm })
    }

    /// Change the solver configuration.
    ///
    /// A changed seed takes effect on the next [`reset`](Solver::reset).
    pub fn config(&mut self, update: &SolverConfigUpdate) -> Result<(), anyhow::Error> {
        self.ctx.config.update(update)
    }

    /// Run until the configured iteration limit is reached.
    pub fn run(&mut self) {
        let rounds = self
            .ctx
            .config
            .iteration_limit
            .saturating_sub(self.ctx.engine.iteration);
        self.run_for(rounds);
    }

    /// Run a given number of further rounds.
    pub fn run_for(&mut self, rounds: u64) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        engine::run(ctx.borrow(), &mut *self.algorithm, rounds);
    }

    /// Return to the state after construction using a new seed.
    ///
    /// Variables are set to the first value of their domain.
    pub fn reset(&mut self, seed: u64) {
        self.ctx.config.seed = seed;
        self.ctx.rng.reseed(seed);
        self.ctx.instance.reset_assignment();
        self.ctx.engine = EngineState::default();
        self.ctx.stats.clear();
        self.algorithm.reset();
    }

    pub fn instance(&self) -> &Instance {
        &self.ctx.instance
    }

    pub fn stats(&self) -> &Stats {
        &self.ctx.stats
    }

    /// Cost of the current assignment.
    pub fn cost(&self) -> Option<Cost> {
        self.ctx.instance.cost()
    }

    /// Number of completed rounds.
    pub fn iteration(&self) -> u64 {
        self.ctx.engine.iteration
    }

    /// Number of messages sent.
    pub fn messages(&self) -> u64 {
        self.ctx.engine.messages
    }

    pub fn status(&self) -> EngineStatus {
        self.ctx.engine.status
    }

    pub fn algorithm_name(&self) -> &'static str {
        self.algorithm.name()
    }

    /// Number of variables decoded from a cover encoding more than one value.
    pub fn decode_ambiguities(&self) -> u64 {
        self.algorithm.decode_ambiguities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use dcop_instance::{test::random_instance, InstanceBuilder};

    fn local_kind() -> impl Strategy<Value = AlgorithmKind> {
        prop_oneof![
            Just(AlgorithmKind::Dsa),
            Just(AlgorithmKind::MaxSum),
            Just(AlgorithmKind::Random),
        ]
    }

    #[test]
    fn agreeing_pair() -> Result<(), anyhow::Error> {
        let mut builder = InstanceBuilder::new();
        builder
            .agent("a0")
            .agent("a1")
            .variable("x0", vec![0, 1], "a0")
            .variable("x1", vec![0, 1], "a1")
            .table_constraint("c", vec!["x0", "x1"], vec![0.0, 5.0, 5.0, 0.0]);

        let instance = builder.build()?;

        let mut solver = Solver::new(instance, AlgorithmKind::MaxSum, SolverConfig::default())?;
        solver.config(&toml::from_str(
            "damping = 0.0\nnoise_scale = 0.0\niteration_limit = 5",
        )?)?;
        solver.run();

        assert_eq!(solver.iteration(), 5);
        assert_eq!(solver.status(), EngineStatus::Finished);
        assert_eq!(solver.cost(), Some(0.0));
        assert_eq!(solver.stats().records().len(), 6);
        assert_eq!(solver.stats().records()[0].iteration, 0);

        solver.run();
        assert_eq!(solver.iteration(), 5);

        Ok(())
    }

    proptest! {
        #[test]
        fn resume(
            instance in random_instance(1..4usize, 1..8usize, 1..4usize, 0.0..0.6),
            kind in local_kind(),
            seed in any::<u64>(),
        ) {
            let config = SolverConfig { seed, ..SolverConfig::default() };

            let mut split = Solver::new(instance.clone(), kind, config.clone()).unwrap();
            split.run_for(10);
            split.run_for(5);

            let mut whole = Solver::new(instance, kind, config).unwrap();
            whole.run_for(15);

            prop_assert_eq!(split.iteration(), 15);
            prop_assert_eq!(split.iteration(), whole.iteration());
            prop_assert_eq!(split.messages(), whole.messages());
            prop_assert_eq!(split.stats().records().len(), whole.stats().records().len());
            prop_assert_eq!(split.instance().assignment(), whole.instance().assignment());
        }

        #[test]
        fn reset(
            instance in random_instance(1..4usize, 1..8usize, 1..4usize, 0.0..0.6),
            kind in local_kind(),
        ) {
            let mut solver = Solver::new(instance.clone(), kind, SolverConfig::default()).unwrap();
            solver.run_for(7);
            solver.reset(99);

            prop_assert_eq!(solver.iteration(), 0);
            prop_assert_eq!(solver.messages(), 0);
            prop_assert_eq!(solver.status(), EngineStatus::Initializing);
            prop_assert!(solver.stats().records().is_empty());
            for var in solver.instance().variables() {
                prop_assert_eq!(var.value_index(), Some(0));
            }

            solver.run_for(4);

            let config = SolverConfig { seed: 99, ..SolverConfig::default() };
            let mut fresh = Solver::new(instance, kind, config).unwrap();
            fresh.run_for(4);

            prop_assert_eq!(solver.messages(), fresh.messages());
            prop_assert_eq!(solver.instance().assignment(), fresh.instance().assignment());
            let costs = |solver: &Solver| -> Vec<_> {
                solver.stats().records().iter().map(|record| record.cost).collect()
            };
            prop_assert_eq!(costs(&solver), costs(&fresh));
        }
    }
}
