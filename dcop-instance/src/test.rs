//! Strategies generating random instances.
use proptest::{prelude::*, *};

use rand::Rng;

use crate::instance::{Cost, Instance, InstanceBuilder};

/// Generate an instance with random binary constraints.
///
/// Every variable gets a random owner and a domain of `1..=max_domain` values. Each pair of
/// variables is constrained with probability `density`, using integral costs in `0..10`.
pub fn random_instance(
    agents: impl Strategy<Value = usize>,
    vars: impl Strategy<Value = usize>,
    max_domain: impl Strategy<Value = usize>,
    density: impl Strategy<Value = f64>,
) -> impl Strategy<Value = Instance> {
    (agents, vars, max_domain, density).prop_flat_map(|(agents, vars, max_domain, density)| {
        let agents = agents.max(1);
        let max_domain = max_domain.max(1);
        collection::vec(0..agents, vars).prop_perturb(move |owners, mut rng| {
            let mut builder = InstanceBuilder::new();
            for agent in 0..agents {
                builder.agent(format!("a{}", agent));
            }

            let mut domain_sizes = vec![];
            for (var, owner) in owners.iter().enumerate() {
                let size = rng.gen_range(1, max_domain + 1);
                domain_sizes.push(size);
                builder.variable(
                    format!("x{}", var),
                    (0..size as i64).map(|value| value * 10),
                    format!("a{}", owner),
                );
            }

            for a in 0..vars {
                for b in 0..a {
                    if rng.gen_bool(density) {
                        let costs: Vec<Cost> = (0..domain_sizes[a] * domain_sizes[b])
                            .map(|_| rng.gen_range(0, 10) as Cost)
                            .collect();
                        let scope = if rng.gen() { [a, b] } else { [b, a] };
                        let (first, second) = (scope[0], scope[1]);
                        let costs = if first == a {
                            costs
                        } else {
                            transpose(&costs, domain_sizes[a], domain_sizes[b])
                        };
                        builder.table_constraint(
                            format!("c{}_{}", first, second),
                            vec![format!("x{}", first), format!("x{}", second)],
                            costs,
                        );
                    }
                }
            }

            builder
                .build()
                .expect("generated instance is well formed")
        })
    })
}

/// Transpose a row major `rows x cols` table.
fn transpose(costs: &[Cost], rows: usize, cols: usize) -> Vec<Cost> {
    let mut transposed = Vec::with_capacity(costs.len());
    for col in 0..cols {
        for row in 0..rows {
            transposed.push(costs[row * cols + col]);
        }
    }
    transposed
}

/// Generate a weighted vertex cover problem over Boolean variables.
///
/// Each variable `x<i>` has a unary constraint charging an integral weight in `1..=5` for the
/// value 1. Each edge is a binary constraint charging `big_m` when both endpoints are 0. Variables
/// are distributed over `agents` agents.
pub fn vertex_cover_instance(
    agents: impl Strategy<Value = usize>,
    vars: impl Strategy<Value = usize>,
    density: impl Strategy<Value = f64>,
    big_m: Cost,
) -> impl Strategy<Value = Instance> {
    (agents, vars, density).prop_flat_map(move |(agents, vars, density)| {
        let agents = agents.max(1);
        collection::vec(0..agents, vars).prop_perturb(move |owners, mut rng| {
            let mut builder = InstanceBuilder::new();
            for agent in 0..agents {
                builder.agent(format!("a{}", agent));
            }
            for (var, owner) in owners.iter().enumerate() {
                builder.variable(format!("x{}", var), vec![0, 1], format!("a{}", owner));
                builder.table_constraint(
                    format!("w{}", var),
                    vec![format!("x{}", var)],
                    vec![0.0, rng.gen_range(1, 6) as Cost],
                );
            }
            for a in 0..vars {
                for b in 0..a {
                    if rng.gen_bool(density) {
                        builder.constraint(
                            format!("e{}_{}", b, a),
                            vec![format!("x{}", b), format!("x{}", a)],
                            0.0,
                            vec![(vec![0, 0], big_m)],
                        );
                    }
                }
            }
            builder
                .build()
                .expect("generated instance is well formed")
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_table() {
        assert_eq!(
            transpose(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3),
            vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]
        );
    }
}
