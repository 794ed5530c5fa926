//! The labeled graph.

pub use digest::digest;
pub use labeled_graph::{Arcs, LabeledGraph};

mod digest;
mod labeled_graph;
