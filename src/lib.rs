//! Isomorphism-aware aggregation of labeled subgraph counts.

pub mod aggregator;
pub mod builder;
pub mod error;
pub mod labeled_graph;
pub mod matcher;
pub mod plan;
pub mod reader;
pub mod task;
pub mod types;
