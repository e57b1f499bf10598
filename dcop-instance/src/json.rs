//! Loader for instances described as JSON.
//!
//! The expected layout is
//!
//! ```json
//! {
//!     "variables": { "v0": { "domain": [0, 1], "agent": "a0", "id": 0 } },
//!     "agents": { "a0": { "vars": ["v0"] } },
//!     "constraints": { "c0": { "scope": ["v0"], "vals": [0, 3] } }
//! }
//! ```
//!
//! A constraint lists either `vals`, one cost per tuple of the product of its scope domains (last
//! scope variable varying fastest), or explicit `values` entries together with a `default_cost`.
//! Other fields are ignored.
use std::collections::BTreeMap;
use std::io;

use anyhow::{bail, Error};
use log::info;
use serde::Deserialize;

use crate::instance::{Cost, Instance, InstanceBuilder, Value};

#[derive(Deserialize)]
struct InstanceDesc {
    variables: BTreeMap<String, VariableDesc>,
    #[serde(default)]
    agents: BTreeMap<String, AgentDesc>,
    #[serde(default)]
    constraints: BTreeMap<String, ConstraintDesc>,
}

#[derive(Deserialize)]
struct VariableDesc {
    domain: Vec<Value>,
    #[serde(default)]
    agent: Option<String>,
    #[serde(default)]
    id: Option<u64>,
}

#[derive(Deserialize)]
struct AgentDesc {
    #[serde(default)]
    vars: Vec<String>,
}

#[derive(Deserialize)]
struct ConstraintDesc {
    scope: Vec<String>,
    #[serde(default)]
    vals: Option<Vec<Cost>>,
    #[serde(default)]
    values: Vec<TupleCost>,
    #[serde(default)]
    default_cost: Cost,
}

#[derive(Deserialize)]
struct TupleCost {
    tuple: Vec<Value>,
    cost: Cost,
}

/// Parse an instance from JSON.
///
/// Variables are numbered by ascending `id`, variables without an id come last in name order.
pub fn parse(input: impl io::Read) -> Result<Instance, Error> {
    let desc: InstanceDesc = serde_json::from_reader(io::BufReader::new(input))?;
    let instance = build(desc)?;

    info!(
        "Parsed instance with {} agents, {} variables and {} constraints",
        instance.agents().len(),
        instance.variables().len(),
        instance.constraints().len()
    );

    Ok(instance)
}

/// Parse an instance from a JSON string.
pub fn from_str(input: &str) -> Result<Instance, Error> {
    parse(input.as_bytes())
}

fn build(desc: InstanceDesc) -> Result<Instance, Error> {
    let mut builder = InstanceBuilder::new();

    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    for (agent, agent_desc) in desc.agents.iter() {
        builder.agent(agent.as_str());
        for var in agent_desc.vars.iter() {
            if let Some(previous) = owners.insert(var, agent) {
                if previous != agent.as_str() {
                    bail!("variable '{}' is listed by agents '{}' and '{}'", var, previous, agent);
                }
            }
        }
    }

    let mut variables: Vec<(&String, &VariableDesc)> = desc.variables.iter().collect();
    variables.sort_by_key(|(_, var_desc)| (var_desc.id.is_none(), var_desc.id));

    for (name, var_desc) in variables {
        let owner = match (&var_desc.agent, owners.get(name.as_str())) {
            (Some(agent), Some(&listed)) if agent != listed => bail!(
                "variable '{}' belongs to agent '{}' but is listed by agent '{}'",
                name,
                agent,
                listed
            ),
            (Some(agent), _) => agent.clone(),
            (None, Some(&listed)) => listed.to_owned(),
            (None, None) => bail!("variable '{}' has no agent", name),
        };
        if !builder.has_agent(&owner) {
            builder.agent(owner.clone());
        }
        builder.variable(name.as_str(), var_desc.domain.iter().cloned(), owner);
    }

    for (name, con_desc) in desc.constraints.into_iter() {
        match con_desc.vals {
            Some(vals) => {
                if !con_desc.values.is_empty() {
                    bail!("constraint '{}' has both 'vals' and 'values'", name);
                }
                builder.table_constraint(name, con_desc.scope, vals);
            }
            None => {
                let entries = con_desc
                    .values
                    .into_iter()
                    .map(|entry| (entry.tuple, entry.cost));
                builder.constraint(name, con_desc.scope, con_desc.default_cost, entries);
            }
        }
    }

    Ok(builder.build()?)
}
