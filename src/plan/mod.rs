//! The extension plan produced by the subgraph enumerator.

pub use plan::{Plan, PlanEdge, PlanNode, PlanOperation};

mod plan;
