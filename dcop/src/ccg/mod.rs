//! Solving via the constraint composite graph of an instance.
//!
//! An external tool reduces the instance to a minimum weight vertex cover problem on a graph of
//! Boolean nodes. The graph is split into one gadget per agent and solved by message passing or
//! local search. Covers are decoded back into variable assignments.
pub mod dsa;
pub mod gadgets;
pub mod graph;
pub mod max_sum;
pub mod reduce;

pub use dsa::CcgDsa;
pub use gadgets::{Gadget, Gadgets, PartitionError};
pub use graph::{CcgEdge, CcgGraph, CcgNode, EdgeIndex, NodeIndex, NodeKind};
pub use max_sum::{CcgMaxSum, Mode};
pub use reduce::{reduce, ExternalOracle, ReductionError, ReductionOracle};
