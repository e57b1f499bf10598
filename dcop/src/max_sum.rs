//! Max-Sum message passing on the factor graph of an instance.
use partial_ref::{partial, PartialRef};

use dcop_instance::{AgentId, ConstraintId, Instance, Odometer, Tuple, Value, VarId};

use crate::algorithm::{assign_random, Algorithm, AgentCtx};
use crate::context::{ConfigP, Context, EngineP, InstanceP, RngP};
use crate::messages::{argmin, damp, normalize, perturb};

/// Messages indexed by constraint, scope position and domain position.
type Messages = Vec<Vec<Vec<f64>>>;

/// Max-Sum with damping and noise.
///
/// Each agent computes the variable to constraint messages of its own variables and the
/// constraint to variable messages of the constraints it controls. Messages are double buffered:
/// the first phase of a round snapshots the messages an agent is about to replace, and the
/// computation only reads snapshots.
pub struct MaxSum {
    /// Incident constraints of each variable together with the variable's scope position.
    incidences: Vec<Vec<(ConstraintId, usize)>>,
    var_to_con: Messages,
    con_to_var: Messages,
    previous_var_to_con: Messages,
    previous_con_to_var: Messages,
}

impl MaxSum {
    pub fn new(instance: &Instance) -> MaxSum {
        let mut incidences = vec![vec![]; instance.variables().len()];
        let mut messages = vec![];
        for constraint_id in instance.constraint_ids() {
            let constraint = instance.constraint(constraint_id);
            let mut scope_messages = vec![];
            for (position, &var) in constraint.scope().iter().enumerate() {
                incidences[var.index()].push((constraint_id, position));
                scope_messages.push(vec![0.0; instance.variable(var).domain_size()]);
            }
            messages.push(scope_messages);
        }

        MaxSum {
            incidences,
            var_to_con: messages.clone(),
            con_to_var: messages.clone(),
            previous_var_to_con: messages.clone(),
            previous_con_to_var: messages,
        }
    }

    /// Sum of the incoming constraint messages of a variable.
    fn belief(&self, instance: &Instance, var: VarId) -> Vec<f64> {
        let mut belief = vec![0.0; instance.variable(var).domain_size()];
        for &(constraint, position) in self.incidences[var.index()].iter() {
            let message = &self.con_to_var[constraint.index()][position];
            for (total, &entry) in belief.iter_mut().zip(message) {
                *total += entry;
            }
        }
        belief
    }

    /// Assign each variable of an agent its most preferred value.
    fn decode(&self, mut ctx: partial!(Context, mut InstanceP), agent: AgentId) {
        let decisions: Vec<(VarId, usize)> = {
            let instance = ctx.part(InstanceP);
            instance
                .agent(agent)
                .variables()
                .iter()
                .map(|&var| (var, argmin(&self.belief(instance, var))))
                .collect()
        };
        let instance = ctx.part_mut(InstanceP);
        for (var, index) in decisions {
            instance.assign(var, index);
        }
    }

    /// Compute the messages of an agent's variables.
    fn update_variables(
        &mut self,
        mut ctx: partial!(Context, mut RngP, ConfigP, InstanceP),
        agent: AgentId,
    ) -> usize {
        let (config, mut ctx) = ctx.split_part(ConfigP);
        let (instance, mut ctx) = ctx.split_part(InstanceP);
        let mut sent = 0;

        for &var in instance.agent(agent).variables() {
            let domain_size = instance.variable(var).domain_size();
            let incidences = &self.incidences[var.index()];
            for &(constraint, position) in incidences.iter() {
                let mut message = vec![0.0; domain_size];
                for &(other, other_position) in incidences.iter() {
                    if other == constraint {
                        continue;
                    }
                    let incoming = &self.previous_con_to_var[other.index()][other_position];
                    for (entry, &value) in message.iter_mut().zip(incoming) {
                        *entry += value;
                    }
                }
                normalize(&mut message);
                perturb(&mut message, config.noise_scale, ctx.part_mut(RngP));
                damp(
                    &mut message,
                    &self.previous_var_to_con[constraint.index()][position],
                    config.damping,
                );
                self.var_to_con[constraint.index()][position] = message;
                sent += 1;
            }
        }

        sent
    }

    /// Compute the messages of the constraints controlled by an agent.
    ///
    /// A single enumeration of each scope's joint assignments yields the messages to all scope
    /// variables.
    fn update_constraints(
        &mut self,
        ctx: partial!(Context, ConfigP, InstanceP),
        agent: AgentId,
    ) -> usize {
        let damping = ctx.part(ConfigP).damping;
        let instance = ctx.part(InstanceP);
        let mut sent = 0;
        let mut tuple = Tuple::new();

        for &constraint_id in instance.agent(agent).controlled_constraints() {
            let constraint = instance.constraint(constraint_id);
            let domains: Vec<&[Value]> = constraint
                .scope()
                .iter()
                .map(|&var| instance.variable(var).domain())
                .collect();
            let incoming = &self.previous_var_to_con[constraint_id.index()];

            let mut outgoing: Vec<Vec<f64>> = domains
                .iter()
                .map(|domain| vec![f64::INFINITY; domain.len()])
                .collect();

            let mut odometer = Odometer::new(domains.iter().map(|domain| domain.len()));
            while let Some(positions) = odometer.advance() {
                tuple.clear();
                tuple.extend(
                    positions
                        .iter()
                        .zip(domains.iter())
                        .map(|(&index, domain)| domain[index]),
                );
                let cost = constraint.evaluate_tuple(&tuple);

                for (target, &index) in positions.iter().enumerate() {
                    let mut total = cost;
                    for (source, &source_index) in positions.iter().enumerate() {
                        if source != target {
                            total += incoming[source][source_index];
                        }
                    }
                    let entry = &mut outgoing[target][index];
                    if total < *entry {
                        *entry = total;
                    }
                }
            }

            for (position, mut message) in outgoing.into_iter().enumerate() {
                normalize(&mut message);
                damp(
                    &mut message,
                    &self.previous_con_to_var[constraint_id.index()][position],
                    damping,
                );
                self.con_to_var[constraint_id.index()][position] = message;
                sent += 1;
            }
        }

        sent
    }
}

fn clear(messages: &mut Messages) {
    for message in messages.iter_mut().flat_map(|scope| scope.iter_mut()) {
        for entry in message.iter_mut() {
            *entry = 0.0;
        }
    }
}

impl Algorithm for MaxSum {
    fn name(&self) -> &'static str {
        "maxsum"
    }

    fn on_start(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        assign_random(ctx.borrow(), agent);
    }

    fn on_cycle_start(&mut self, ctx: AgentCtx, agent: AgentId) {
        let instance = ctx.part(InstanceP);
        let agent = instance.agent(agent);

        for &var in agent.variables() {
            for &(constraint, position) in self.incidences[var.index()].iter() {
                let (c, p) = (constraint.index(), position);
                self.previous_var_to_con[c][p].clone_from(&self.var_to_con[c][p]);
            }
        }

        for &constraint in agent.controlled_constraints() {
            let c = constraint.index();
            self.previous_con_to_var[c].clone_from(&self.con_to_var[c]);
        }
    }

    fn on_current_cycle(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        let mut sent = self.update_variables(ctx.borrow(), agent);
        sent += self.update_constraints(ctx.borrow(), agent);
        ctx.part_mut(EngineP).count_messages(sent);
    }

    fn on_cycle_end(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        self.decode(ctx.borrow(), agent);
    }

    fn on_termination(&mut self, mut ctx: AgentCtx, agent: AgentId) {
        self.decode(ctx.borrow(), agent);
    }

    fn reset(&mut self) {
        clear(&mut self.var_to_con);
        clear(&mut self.con_to_var);
        clear(&mut self.previous_var_to_con);
        clear(&mut self.previous_con_to_var);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;
    use proptest::prelude::*;

    use dcop_instance::{test::random_instance, InstanceBuilder};

    use crate::config::SolverConfig;
    use crate::engine;

    fn solve(instance: Instance, config: SolverConfig, rounds: u64) -> (MaxSum, Box<Context>) {
        let mut ctx = Box::new(Context::default());
        ctx.instance = instance;
        ctx.config = config;
        let mut algorithm = MaxSum::new(&ctx.instance);
        {
            let mut ctx = ctx.into_partial_ref_mut();
            engine::run(ctx.borrow(), &mut algorithm, rounds);
        }
        (algorithm, ctx)
    }

    fn exact_config() -> SolverConfig {
        SolverConfig {
            damping: 0.0,
            noise_scale: 0.0,
            ..SolverConfig::default()
        }
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

        let (_, ctx) = solve(instance, exact_config(), 5);

        assert_eq!(ctx.instance.cost(), Some(0.0));
        let assignment = ctx.instance.assignment();
        assert_eq!(assignment[0], assignment[1]);
        // one message per direction and scope position each round
        assert_eq!(ctx.engine.messages, 5 * 4);

        Ok(())
    }

    #[test]
    fn unary_bias_crosses_pair() -> Result<(), anyhow::Error> {
        let mut builder = InstanceBuilder::new();
        builder
            .agent("a0")
            .agent("a1")
            .variable("x0", vec![0, 1], "a0")
            .variable("x1", vec![0, 1], "a1")
            .table_constraint("u", vec!["x0"], vec![2.0, 0.0])
            .table_constraint("c", vec!["x0", "x1"], vec![0.0, 5.0, 5.0, 0.0]);
        let instance = builder.build()?;

        let (algorithm, ctx) = solve(instance, exact_config(), 5);

        // x1 only learns about the bias through x0 and c
        assert_eq!(ctx.instance.assignment(), vec![Some(1), Some(1)]);
        assert_eq!(ctx.instance.cost(), Some(0.0));
        assert_eq!(algorithm.belief(&ctx.instance, VarId::from_index(1)), vec![2.0, 0.0]);
        assert_eq!(ctx.engine.messages, 5 * 6);

        Ok(())
    }

    #[test]
    fn ternary_constraint_messages() -> Result<(), anyhow::Error> {
        let mut builder = InstanceBuilder::new();
        builder
            .agent("a0")
            .variable("x", vec![0, 1], "a0")
            .variable("y", vec![0, 1, 2], "a0")
            .variable("z", vec![0, 1], "a0")
            .constraint(
                "c",
                vec!["x", "y", "z"],
                4.0,
                vec![(vec![1, 2, 0], 0.0), (vec![0, 0, 0], 1.0)],
            );
        let instance = builder.build()?;

        let (algorithm, ctx) = solve(instance, exact_config(), 3);

        assert_eq!(algorithm.con_to_var[0][1], vec![1.0, 4.0, 0.0]);
        assert_eq!(ctx.instance.assignment(), vec![Some(1), Some(2), Some(0)]);
        assert_eq!(ctx.instance.cost(), Some(0.0));

        Ok(())
    }

    proptest! {
        #[test]
        fn messages_normalized(
            instance in random_instance(1..4usize, 1..7usize, 1..4usize, 0.0..1.0),
        ) {
            let (algorithm, _) = solve(instance, exact_config(), 3);

            for messages in [&algorithm.var_to_con, &algorithm.con_to_var].iter() {
                for message in messages.iter().flat_map(|scope| scope.iter()) {
                    let min = message.iter().cloned().fold(f64::INFINITY, f64::min);
                    prop_assert_eq!(min, 0.0);
                }
            }
        }
    }
}
