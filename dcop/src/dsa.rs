//! Distributed stochastic local search.
use partial_ref::{partial, PartialRef};
use rand::Rng;

use dcop_instance::{AgentId, ConstraintId, Cost, Instance, Odometer, Tuple};

use crate::algorithm::{assign_random, Algorithm, AgentCtx};
use crate::config::DsaVariant;
use crate::context::{ConfigP, Context, EngineP, InstanceP, RngP};

/// Decide whether to move to the best alternative.
///
/// `delta` is the current cost minus the cost of the alternative. A worsening move is never
/// taken. `conflicted` tells whether the current state violates a constraint and only matters to
/// [`DsaVariant::B`].
pub fn should_switch(
    variant: DsaVariant,
    delta: Cost,
    conflicted: bool,
    probability: f64,
    rng: &mut impl Rng,
) -> bool {
    let eligible = if delta > 0.0 {
        true
    } else if delta == 0.0 {
        match variant {
            DsaVariant::A => false,
            DsaVariant::B => conflicted,
            DsaVariant::C => true,
        }
    } else {
        false
    };
    eligible && rng.gen_bool(probability)
}

/// DSA over the variables of an instance.
///
/// Each agent jointly optimizes its own variables against the values its neighbors published at
/// the start of the round.
pub struct Dsa {
    /// Domain positions of all variables as published at the start of the round.
    view: Vec<Option<usize>>,
    /// Moves chosen during the current round, committed at its end.
    pending: Vec<Option<usize>>,
    tuple: Tuple,
}

impl Dsa {
    pub fn new(instance: &Instance) -> Dsa {
        Dsa {
            view: vec![None; instance.variables().len()],
            pending: vec![None; instance.variables().len()],
            tuple: Tuple::new(),
        }
    }

    /// Summed cost of constraints under the given domain positions.
    fn local_cost(
        &mut self,
        instance: &Instance,
        constraints: &[ConstraintId],
        positions: &[Option<usize>],
    ) -> Cost {
        let mut total = 0.0;
        for &constraint_id in constraints {
            let constraint = instance.constraint(constraint_id);
            self.tuple.clear();
            for &var in constraint.scope() {
                let domain = instance.variable(var).domain();
                self.tuple.push(domain[positions[var.index()].unwrap_or(0)]);
            }
            total += constraint.evaluate_tuple(&self.tuple);
        }
        total
    }

    fn choose_move(
        &mut self,
        mut ctx: partial!(Context, mut RngP, ConfigP, InstanceP),
        agent: AgentId,
    ) {
        let (instance, mut ctx) = ctx.split_part(InstanceP);
        let (config, mut ctx) = ctx.split_part(ConfigP);
        let agent = instance.agent(agent);
        let variables = agent.variables();
        if variables.is_empty() {
            return;
        }

        let mut positions = self.view.clone();
        let current = self.local_cost(instance, agent.constraints(), &positions);
        let current_positions: Vec<Option<usize>> = variables
            .iter()
            .map(|&var| positions[var.index()])
            .collect();

        let mut best: Option<(Cost, Vec<usize>)> = None;
        let mut odometer = Odometer::new(
            variables
                .iter()
                .map(|&var| instance.variable(var).domain_size()),
        );
        while let Some(candidate) = odometer.advance() {
            if candidate
                .iter()
                .zip(current_positions.iter())
                .all(|(&index, &current)| Some(index) == current)
            {
                continue;
            }
            for (&var, &index) in variables.iter().zip(candidate) {
                positions[var.index()] = Some(index);
            }
            let cost = self.local_cost(instance, agent.constraints(), &positions);
            if best.as_ref().map_or(true, |&(best_cost, _)| cost < best_cost) {
                best = Some((cost, candidate.to_vec()));
            }
        }

        if let Some((best_cost, candidate)) = best {
            let switch = should_switch(
                config.dsa_variant,
                current - best_cost,
                current > 0.0,
                config.dsa_probability,
                ctx.part_mut(RngP),
            );
            if switch {
                for (&var, &index) in variables.iter().zip(candidate.iter()) {
                    self.pending[var.index()] = Some(index);
                }
            }
        }
    }
}

impl Algorithm for Dsa {
    fn name(&self) -> &'static str {
        "dsa"
    }

    fn on_start(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        assign_random(ctx.borrow(), agent);
    }

    fn on_cycle_start(&mut self, ctx: AgentCtx, agent: AgentId) {
        let instance = ctx.part(InstanceP);
        for &var in instance.agent(agent).variables() {
            self.view[var.index()] = instance.variable(var).value_index();
        }
    }

    fn on_current_cycle(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        let neighbors = ctx.part(InstanceP).agent(agent).neighbors().len();
        ctx.part_mut(EngineP).count_messages(neighbors);
        self.choose_move(ctx.borrow(), agent);
    }

    fn on_cycle_end(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        let instance = ctx.part_mut(InstanceP);
        for index in 0..instance.agent(agent).variables().len() {
            let var = instance.agent(agent).variables()[index];
            if let Some(position) = self.pending[var.index()].take() {
                instance.assign(var, position);
            }
        }
    }

    fn reset(&mut self) {
        for entry in self.view.iter_mut().chain(self.pending.iter_mut()) {
            *entry = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;
    use proptest::prelude::*;

    use dcop_instance::test::random_instance;

    use crate::config::SolverConfig;
    use crate::engine;
    use crate::rng::SolverRng;

    #[test]
    fn never_switch_to_worse() {
        let mut rng = SolverRng::new(3);
        for &variant in [DsaVariant::A, DsaVariant::B, DsaVariant::C].iter() {
            for _ in 0..100 {
                assert!(!should_switch(variant, -1.0, true, 1.0, &mut rng));
            }
        }
    }

    #[test]
    fn ties_depend_on_variant() {
        let mut rng = SolverRng::new(3);
        assert!(!should_switch(DsaVariant::A, 0.0, true, 1.0, &mut rng));
        assert!(!should_switch(DsaVariant::B, 0.0, false, 1.0, &mut rng));
        assert!(should_switch(DsaVariant::B, 0.0, true, 1.0, &mut rng));
        assert!(should_switch(DsaVariant::C, 0.0, false, 1.0, &mut rng));
        assert!(!should_switch(DsaVariant::C, 2.0, false, 0.0, &mut rng));
    }

    #[test]
    fn switch_frequency() {
        let mut rng = SolverRng::new(11);
        let trials = 10000;
        let switches = (0..trials)
            .filter(|_| should_switch(DsaVariant::A, 1.0, false, 0.3, &mut rng))
            .count();
        let frequency = switches as f64 / trials as f64;
        assert!((frequency - 0.3).abs() < 0.03, "frequency {}", frequency);
    }

    fn optimum(instance: &Instance) -> Cost {
        let mut instance = instance.clone();
        let vars: Vec<_> = instance.var_ids().collect();
        let mut odometer = Odometer::new(
            vars.iter()
                .map(|&var| instance.variable(var).domain_size())
                .collect::<Vec<_>>(),
        );
        let mut best = Cost::INFINITY;
        while let Some(positions) = odometer.advance() {
            for (&var, &index) in vars.iter().zip(positions) {
                instance.assign(var, index);
            }
            best = best.min(instance.cost().unwrap_or(Cost::INFINITY));
        }
        best
    }

    proptest! {
        #[test]
        fn single_agent_reaches_optimum(
            instance in random_instance(Just(1usize), 1..6usize, 1..4usize, 0.0..1.0),
        ) {
            let best = optimum(&instance);

            let mut ctx = Box::new(Context::default());
            ctx.instance = instance;
            ctx.config = SolverConfig {
                dsa_variant: DsaVariant::A,
                dsa_probability: 1.0,
                ..SolverConfig::default()
            };
            let mut algorithm = Dsa::new(&ctx.instance);
            {
                let mut ctx = ctx.into_partial_ref_mut();
                engine::run(ctx.borrow(), &mut algorithm, 1);
            }

            prop_assert_eq!(ctx.instance.cost(), Some(best));
            prop_assert_eq!(ctx.engine.messages, 0);
        }
    }
}
