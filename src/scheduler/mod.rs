//! Block scheduling.
//!
//! Per-file priority ordering (heap + task source) and the fan-in
//! multiplexer that turns many registered sources into one task stream
//! for the worker pool.

mod heap;
mod mux;
mod source;

pub use heap::{PriorityBlock, PriorityBlockHeap, PriorityDecider};
pub use mux::TaskScheduler;
pub use source::{BlockTask, BlockTaskSource};
