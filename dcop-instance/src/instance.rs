//! Agents, variables, constraints and the instance tying them together.
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;

use crate::ids::{AgentId, ConstraintId, VarId};
use crate::tuples::Odometer;

/// A domain value.
pub type Value = i64;

/// A constraint cost.
pub type Cost = f64;

/// A tuple of values, one per scope position.
pub type Tuple = SmallVec<[Value; 4]>;

/// Problems detected while building an [`Instance`].
#[derive(Debug, Error, PartialEq)]
pub enum MalformedInstance {
    #[error("duplicate {} name '{}'", kind, name)]
    DuplicateName { kind: &'static str, name: String },
    #[error("variable '{}' has an empty domain", variable)]
    EmptyDomain { variable: String },
    #[error("variable '{}' has the value {} twice in its domain", variable, value)]
    DuplicateDomainValue { variable: String, value: Value },
    #[error("variable '{}' is owned by unknown agent '{}'", variable, agent)]
    UnknownOwner { variable: String, agent: String },
    #[error("constraint '{}' refers to unknown variable '{}'", constraint, variable)]
    UnknownVariable {
        constraint: String,
        variable: String,
    },
    #[error("constraint '{}' has variable '{}' twice in its scope", constraint, variable)]
    DuplicateScopeVariable {
        constraint: String,
        variable: String,
    },
    #[error(
        "constraint '{}' has a tuple of arity {} but its scope has {} variables",
        constraint,
        arity,
        expected
    )]
    Arity {
        constraint: String,
        arity: usize,
        expected: usize,
    },
    #[error("value {} is not in the domain of variable '{}'", value, variable)]
    ValueNotInDomain { variable: String, value: Value },
    #[error(
        "constraint '{}' lists {} costs but the product of its domains has {} tuples",
        constraint,
        len,
        expected
    )]
    TableSize {
        constraint: String,
        len: usize,
        expected: usize,
    },
}

/// A decision variable with a finite domain.
#[derive(Clone, Debug)]
pub struct Variable {
    name: String,
    domain: Vec<Value>,
    value: Option<usize>,
    owner: AgentId,
    constraints: Vec<ConstraintId>,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered domain of this variable.
    pub fn domain(&self) -> &[Value] {
        &self.domain
    }

    pub fn domain_size(&self) -> usize {
        self.domain.len()
    }

    /// Position of the current value within the domain.
    pub fn value_index(&self) -> Option<usize> {
        self.value
    }

    /// The current value, if assigned.
    pub fn value(&self) -> Option<Value> {
        self.value.map(|index| self.domain[index])
    }

    /// Position of `value` within the domain.
    pub fn position(&self, value: Value) -> Option<usize> {
        self.domain.iter().position(|&candidate| candidate == value)
    }

    /// The agent owning this variable.
    pub fn owner(&self) -> AgentId {
        self.owner
    }

    /// Constraints having this variable in their scope.
    pub fn constraints(&self) -> &[ConstraintId] {
        &self.constraints
    }
}

/// A cost function over a tuple of variables.
///
/// Costs are stored sparsely. Tuples not present in the table evaluate to the default cost.
#[derive(Clone, Debug)]
pub struct Constraint {
    name: String,
    scope: Vec<VarId>,
    table: FxHashMap<Tuple, Cost>,
    default_cost: Cost,
}

impl Constraint {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered scope. The order fixes the meaning of tuple positions.
    pub fn scope(&self) -> &[VarId] {
        &self.scope
    }

    pub fn arity(&self) -> usize {
        self.scope.len()
    }

    /// Cost of tuples without an explicit table entry.
    pub fn default_cost(&self) -> Cost {
        self.default_cost
    }

    /// Explicit table entries in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = (&[Value], Cost)> {
        self.table.iter().map(|(tuple, &cost)| (&tuple[..], cost))
    }

    /// Number of explicit table entries.
    pub fn entry_count(&self) -> usize {
        self.table.len()
    }

    /// Cost of a tuple of values given in scope order.
    pub fn evaluate_tuple(&self, tuple: &[Value]) -> Cost {
        debug_assert_eq!(tuple.len(), self.scope.len());
        self.table.get(tuple).cloned().unwrap_or(self.default_cost)
    }
}

/// An agent controlling a set of variables.
#[derive(Clone, Debug)]
pub struct Agent {
    name: String,
    variables: Vec<VarId>,
    constraints: Vec<ConstraintId>,
    controlled_constraints: Vec<ConstraintId>,
    neighbors: Vec<AgentId>,
}

impl Agent {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variables owned by this agent.
    pub fn variables(&self) -> &[VarId] {
        &self.variables
    }

    /// Constraints with at least one owned variable in their scope.
    pub fn constraints(&self) -> &[ConstraintId] {
        &self.constraints
    }

    /// Constraints this agent is responsible for executing.
    ///
    /// Across all agents these partition the constraints of an instance.
    pub fn controlled_constraints(&self) -> &[ConstraintId] {
        &self.controlled_constraints
    }

    /// Agents sharing at least one constraint with this agent.
    pub fn neighbors(&self) -> &[AgentId] {
        &self.neighbors
    }

    /// Record that this agent shares `constraint` with `neighbor`.
    ///
    /// Drops the constraint from the controlled set when a variable of another agent in its scope
    /// sorts before all of this agent's variables in the scope.
    fn add_neighbor(&mut self, neighbor: AgentId, constraint: &Constraint, id: ConstraintId) {
        if !self.neighbors.contains(&neighbor) {
            self.neighbors.push(neighbor);
        }

        let own_min = constraint
            .scope
            .iter()
            .filter(|var| self.variables.contains(var))
            .min();
        let other_min = constraint
            .scope
            .iter()
            .filter(|var| !self.variables.contains(var))
            .min();

        if let (Some(own_min), Some(other_min)) = (own_min, other_min) {
            if other_min < own_min {
                self.controlled_constraints.retain(|&controlled| controlled != id);
            }
        }
    }
}

/// A complete problem instance.
///
/// The structure of an instance is fixed after construction; only the variable assignment
/// changes.
#[derive(Clone, Debug, Default)]
pub struct Instance {
    agents: Vec<Agent>,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    agent_names: FxHashMap<String, AgentId>,
    var_names: FxHashMap<String, VarId>,
    constraint_names: FxHashMap<String, ConstraintId>,
}

impl Instance {
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn agent(&self, agent: AgentId) -> &Agent {
        &self.agents[agent.index()]
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.index()]
    }

    pub fn constraint(&self, constraint: ConstraintId) -> &Constraint {
        &self.constraints[constraint.index()]
    }

    /// Iterate over all agents in name order.
    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> {
        (0..self.agents.len()).map(AgentId::from_index)
    }

    /// Iterate over all variables in insertion order.
    pub fn var_ids(&self) -> impl Iterator<Item = VarId> {
        (0..self.variables.len()).map(VarId::from_index)
    }

    /// Iterate over all constraints in insertion order.
    pub fn constraint_ids(&self) -> impl Iterator<Item = ConstraintId> {
        (0..self.constraints.len()).map(ConstraintId::from_index)
    }

    pub fn agent_by_name(&self, name: &str) -> Option<AgentId> {
        self.agent_names.get(name).cloned()
    }

    pub fn var_by_name(&self, name: &str) -> Option<VarId> {
        self.var_names.get(name).cloned()
    }

    pub fn constraint_by_name(&self, name: &str) -> Option<ConstraintId> {
        self.constraint_names.get(name).cloned()
    }

    /// Largest domain size of any variable.
    pub fn max_domain_size(&self) -> usize {
        self.variables
            .iter()
            .map(|variable| variable.domain.len())
            .max()
            .unwrap_or(0)
    }

    /// Set a variable to the value at the given domain position.
    pub fn assign(&mut self, var: VarId, index: usize) {
        let variable = &mut self.variables[var.index()];
        assert!(
            index < variable.domain.len(),
            "domain position {} out of range for variable '{}'",
            index,
            variable.name
        );
        variable.value = Some(index);
    }

    /// Set a variable to a value of its domain.
    pub fn assign_value(&mut self, var: VarId, value: Value) -> Result<(), MalformedInstance> {
        let variable = &mut self.variables[var.index()];
        match variable.position(value) {
            Some(index) => {
                variable.value = Some(index);
                Ok(())
            }
            None => Err(MalformedInstance::ValueNotInDomain {
                variable: variable.name.clone(),
                value,
            }),
        }
    }

    /// Rewind every variable to the first value of its domain.
    pub fn reset_assignment(&mut self) {
        for variable in self.variables.iter_mut() {
            variable.value = Some(0);
        }
    }

    /// Remove the values of all variables.
    pub fn clear_assignment(&mut self) {
        for variable in self.variables.iter_mut() {
            variable.value = None;
        }
    }

    /// Current values of all variables in insertion order.
    pub fn assignment(&self) -> Vec<Option<Value>> {
        self.variables.iter().map(Variable::value).collect()
    }

    /// Cost of a constraint at the current assignment.
    ///
    /// Returns `None` if a scope variable is unassigned.
    pub fn evaluate(&self, constraint: ConstraintId) -> Option<Cost> {
        let constraint = &self.constraints[constraint.index()];
        let mut tuple = Tuple::new();
        for &var in constraint.scope.iter() {
            tuple.push(self.variables[var.index()].value()?);
        }
        Some(constraint.evaluate_tuple(&tuple))
    }

    /// Total cost of the current assignment.
    ///
    /// Returns `None` if any constrained variable is unassigned.
    pub fn cost(&self) -> Option<Cost> {
        self.constraint_ids().map(|id| self.evaluate(id)).sum()
    }
}

/// Costs of a constraint as given to the builder.
#[derive(Clone, Debug)]
enum TableSpec {
    /// Explicit tuples with a default for all others.
    Sparse {
        entries: Vec<(Vec<Value>, Cost)>,
        default_cost: Cost,
    },
    /// One cost per tuple of the domain product, last scope position varying fastest.
    Dense(Vec<Cost>),
}

#[derive(Clone, Debug)]
struct ConstraintSpec {
    name: String,
    scope: Vec<String>,
    table: TableSpec,
}

#[derive(Clone, Debug)]
struct VariableSpec {
    name: String,
    domain: Vec<Value>,
    owner: String,
}

/// Incrementally describes an [`Instance`].
///
/// All validation happens in [`build`](InstanceBuilder::build).
#[derive(Clone, Debug, Default)]
pub struct InstanceBuilder {
    agents: Vec<String>,
    variables: Vec<VariableSpec>,
    constraints: Vec<ConstraintSpec>,
}

impl InstanceBuilder {
    pub fn new() -> InstanceBuilder {
        InstanceBuilder::default()
    }

    /// Whether an agent of that name was added.
    pub fn has_agent(&self, name: &str) -> bool {
        self.agents.iter().any(|agent| agent == name)
    }

    pub fn agent(&mut self, name: impl Into<String>) -> &mut Self {
        self.agents.push(name.into());
        self
    }

    /// Add a variable owned by the named agent.
    pub fn variable(
        &mut self,
        name: impl Into<String>,
        domain: impl IntoIterator<Item = Value>,
        owner: impl Into<String>,
    ) -> &mut Self {
        self.variables.push(VariableSpec {
            name: name.into(),
            domain: domain.into_iter().collect(),
            owner: owner.into(),
        });
        self
    }

    /// Add a constraint given by explicit tuples of values.
    pub fn constraint(
        &mut self,
        name: impl Into<String>,
        scope: impl IntoIterator<Item = impl Into<String>>,
        default_cost: Cost,
        entries: impl IntoIterator<Item = (Vec<Value>, Cost)>,
    ) -> &mut Self {
        self.constraints.push(ConstraintSpec {
            name: name.into(),
            scope: scope.into_iter().map(Into::into).collect(),
            table: TableSpec::Sparse {
                entries: entries.into_iter().collect(),
                default_cost,
            },
        });
        self
    }

    /// Add a constraint given by one cost for every tuple of the domain product.
    ///
    /// Costs are listed with the last scope variable varying fastest.
    pub fn table_constraint(
        &mut self,
        name: impl Into<String>,
        scope: impl IntoIterator<Item = impl Into<String>>,
        costs: impl IntoIterator<Item = Cost>,
    ) -> &mut Self {
        self.constraints.push(ConstraintSpec {
            name: name.into(),
            scope: scope.into_iter().map(Into::into).collect(),
            table: TableSpec::Dense(costs.into_iter().collect()),
        });
        self
    }

    /// Validate the description and build the instance.
    pub fn build(&self) -> Result<Instance, MalformedInstance> {
        let mut instance = Instance::default();

        let mut agent_names = self.agents.clone();
        agent_names.sort();
        for pair in agent_names.windows(2) {
            if pair[0] == pair[1] {
                return Err(MalformedInstance::DuplicateName {
                    kind: "agent",
                    name: pair[0].clone(),
                });
            }
        }
        for name in agent_names {
            let id = AgentId::from_index(instance.agents.len());
            instance.agent_names.insert(name.clone(), id);
            instance.agents.push(Agent {
                name,
                variables: vec![],
                constraints: vec![],
                controlled_constraints: vec![],
                neighbors: vec![],
            });
        }

        for spec in self.variables.iter() {
            let id = VarId::from_index(instance.variables.len());
            if instance.var_names.insert(spec.name.clone(), id).is_some() {
                return Err(MalformedInstance::DuplicateName {
                    kind: "variable",
                    name: spec.name.clone(),
                });
            }
            if spec.domain.is_empty() {
                return Err(MalformedInstance::EmptyDomain {
                    variable: spec.name.clone(),
                });
            }
            for (index, value) in spec.domain.iter().enumerate() {
                if spec.domain[..index].contains(value) {
                    return Err(MalformedInstance::DuplicateDomainValue {
                        variable: spec.name.clone(),
                        value: *value,
                    });
                }
            }
            let owner = match instance.agent_names.get(&spec.owner) {
                Some(&owner) => owner,
                None => {
                    return Err(MalformedInstance::UnknownOwner {
                        variable: spec.name.clone(),
                        agent: spec.owner.clone(),
                    })
                }
            };
            instance.agents[owner.index()].variables.push(id);
            instance.variables.push(Variable {
                name: spec.name.clone(),
                domain: spec.domain.clone(),
                value: None,
                owner,
                constraints: vec![],
            });
        }

        for spec in self.constraints.iter() {
            let constraint = build_constraint(&instance, spec)?;
            let id = ConstraintId::from_index(instance.constraints.len());
            if instance
                .constraint_names
                .insert(spec.name.clone(), id)
                .is_some()
            {
                return Err(MalformedInstance::DuplicateName {
                    kind: "constraint",
                    name: spec.name.clone(),
                });
            }

            for &var in constraint.scope.iter() {
                instance.variables[var.index()].constraints.push(id);
                let owner = instance.variables[var.index()].owner;
                let agent = &mut instance.agents[owner.index()];
                if !agent.constraints.contains(&id) {
                    agent.constraints.push(id);
                    agent.controlled_constraints.push(id);
                }
            }
            instance.constraints.push(constraint);
        }

        connect_neighbors(&mut instance);

        Ok(instance)
    }
}

/// Resolve the scope and table of a constraint.
fn build_constraint(
    instance: &Instance,
    spec: &ConstraintSpec,
) -> Result<Constraint, MalformedInstance> {
    let mut scope: Vec<VarId> = vec![];
    for var_name in spec.scope.iter() {
        let var = match instance.var_names.get(var_name) {
            Some(&var) => var,
            None => {
                return Err(MalformedInstance::UnknownVariable {
                    constraint: spec.name.clone(),
                    variable: var_name.clone(),
                })
            }
        };
        if scope.contains(&var) {
            return Err(MalformedInstance::DuplicateScopeVariable {
                constraint: spec.name.clone(),
                variable: var_name.clone(),
            });
        }
        scope.push(var);
    }

    let domains: Vec<&[Value]> = scope
        .iter()
        .map(|&var| instance.variables[var.index()].domain())
        .collect();

    let mut table = FxHashMap::default();
    let default_cost;

    match &spec.table {
        TableSpec::Sparse {
            entries,
            default_cost: spec_default,
        } => {
            default_cost = *spec_default;
            for (tuple, cost) in entries.iter() {
                if tuple.len() != scope.len() {
                    return Err(MalformedInstance::Arity {
                        constraint: spec.name.clone(),
                        arity: tuple.len(),
                        expected: scope.len(),
                    });
                }
                for ((&value, domain), &var) in tuple.iter().zip(domains.iter()).zip(scope.iter())
                {
                    if !domain.contains(&value) {
                        return Err(MalformedInstance::ValueNotInDomain {
                            variable: instance.variables[var.index()].name.clone(),
                            value,
                        });
                    }
                }
                table.insert(tuple.iter().cloned().collect::<Tuple>(), *cost);
            }
        }
        TableSpec::Dense(costs) => {
            default_cost = 0.0;
            let mut odometer = Odometer::new(domains.iter().map(|domain| domain.len()));
            let expected = odometer.tuple_count();
            if costs.len() != expected {
                return Err(MalformedInstance::TableSize {
                    constraint: spec.name.clone(),
                    len: costs.len(),
                    expected,
                });
            }
            let mut costs = costs.iter();
            while let Some(positions) = odometer.advance() {
                let tuple: Tuple = positions
                    .iter()
                    .zip(domains.iter())
                    .map(|(&position, domain)| domain[position])
                    .collect();
                if let Some(&cost) = costs.next() {
                    table.insert(tuple, cost);
                }
            }
        }
    }

    Ok(Constraint {
        name: spec.name.clone(),
        scope,
        table,
        default_cost,
    })
}

/// Establish neighbor relations and settle which agent controls each constraint.
fn connect_neighbors(instance: &mut Instance) {
    for (index, constraint) in instance.constraints.iter().enumerate() {
        let id = ConstraintId::from_index(index);
        let mut clique: Vec<AgentId> = constraint
            .scope
            .iter()
            .map(|&var| instance.variables[var.index()].owner)
            .collect();
        clique.sort();
        clique.dedup();

        for &agent in clique.iter() {
            for &neighbor in clique.iter() {
                if agent != neighbor {
                    instance.agents[agent.index()].add_neighbor(neighbor, constraint, id);
                }
            }
        }
    }
}
