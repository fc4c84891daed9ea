//! Per-file block task source.

use crate::file::BlockId;

use super::heap::{PriorityBlockHeap, PriorityDecider};

/// One block-fetch assignment, produced once per scheduling decision and
/// consumed exactly once by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTask {
    /// Coordination-store key identifying the file being fetched.
    pub file_key: String,
    pub block: BlockId,
    /// Fetch from a server rather than a peer.
    pub from_server: bool,
}

/// Produces the blocks of one file in priority order.
///
/// Built once per download attempt with every block admitted up front;
/// irreversibly exhausted after `block_count` pops, at which point the
/// multiplexer retires it.
pub struct BlockTaskSource {
    file_key: String,
    heap: PriorityBlockHeap,
}

impl BlockTaskSource {
    pub fn new(
        file_key: impl Into<String>,
        block_count: usize,
        decider: &dyn PriorityDecider,
    ) -> Self {
        let mut heap = PriorityBlockHeap::with_capacity(block_count);
        for block in 0..block_count {
            heap.enqueue(block, decider);
        }
        Self {
            file_key: file_key.into(),
            heap,
        }
    }

    pub fn file_key(&self) -> &str {
        &self.file_key
    }

    /// Tasks left before exhaustion. The multiplexer checks this instead
    /// of popping blind.
    pub fn remaining(&self) -> usize {
        self.heap.len()
    }

    /// Pop the lowest-priority block and wrap it with the file identity.
    pub fn next_task(&mut self) -> Option<BlockTask> {
        self.heap.pop_lowest().map(|entry| BlockTask {
            file_key: self.file_key.clone(),
            block: entry.id,
            from_server: entry.from_server,
        })
    }
}
