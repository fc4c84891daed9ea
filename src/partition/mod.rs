//! Duty/other block partitioning.
//!
//! Splits a file's block indices into the blocks this node is primarily
//! responsible for ("duties") and the rest ("others"), serving each
//! partition round-robin and reclassifying when cluster topology changes.

mod selector;

pub use selector::{DutyDecider, DutyPartitioner};
