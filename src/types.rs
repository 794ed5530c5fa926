//! Various types related to labeled query counting.

/// The vertex id type, i.e. a position in a stage's construction order.
pub type VId = usize;

/// The vertex label type.
pub type VLabel = u32;

/// The edge label type.
///
/// Every arc currently carries the default label `0`.
pub type ELabel = u32;

/// The plan stage id type.
pub type StageId = usize;

/// The occurrence count type.
pub type Count = u64;
