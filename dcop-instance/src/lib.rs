//! Problem instances for the dcop solver.
//!
//! An [`Instance`] consists of agents owning variables with finite domains and of constraints
//! assigning costs to tuples of values. The solver minimizes the summed cost of all constraints.

pub mod ids;
pub mod instance;
pub mod json;
pub mod tuples;

#[cfg(any(test, feature = "internal-testing"))]
pub mod test;

pub use ids::{AgentId, ConstraintId, VarId};
pub use instance::{
    Agent, Constraint, Cost, Instance, InstanceBuilder, MalformedInstance, Tuple, Value, Variable,
};
pub use tuples::Odometer;
