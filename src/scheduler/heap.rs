//! Min-priority heap over block indices.
//!
//! Priority and source flag are computed exactly once, when a block is
//! admitted, by the caller-supplied decider. They are never recomputed for
//! a queued entry; changing a block's priority means re-admitting it.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::file::BlockId;

/// Decides fetch order for blocks at enqueue time.
pub trait PriorityDecider: Send + Sync {
    /// Priority for `block` (lower is fetched sooner) and whether the
    /// block should be fetched from a server rather than a peer.
    fn decide(&self, block: BlockId) -> (i64, bool);
}

/// One queued block with its admission-time decision.
#[derive(Debug, Clone, Copy)]
pub struct PriorityBlock {
    pub id: BlockId,
    pub priority: i64,
    pub from_server: bool,
}

impl PartialEq for PriorityBlock {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for PriorityBlock {}

impl PartialOrd for PriorityBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Ordered by priority alone; ties break by heap-internal order, which
// callers must not rely on.
impl Ord for PriorityBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}

/// Min-heap of blocks keyed by admission-time priority.
#[derive(Debug, Default)]
pub struct PriorityBlockHeap {
    heap: BinaryHeap<Reverse<PriorityBlock>>,
}

impl PriorityBlockHeap {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    /// Admit `block`, computing its priority and source flag once.
    pub fn enqueue(&mut self, block: BlockId, decider: &dyn PriorityDecider) {
        let (priority, from_server) = decider.decide(block);
        self.heap.push(Reverse(PriorityBlock {
            id: block,
            priority,
            from_server,
        }));
    }

    /// Remove and return the lowest-priority entry, or `None` when the
    /// heap is exhausted. Callers that must not observe exhaustion track
    /// `len()` instead of popping blind.
    pub fn pop_lowest(&mut self) -> Option<PriorityBlock> {
        self.heap.pop().map(|Reverse(block)| block)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Priority = id reversed within 100, even ids come from servers.
    struct ReverseDecider;

    impl PriorityDecider for ReverseDecider {
        fn decide(&self, block: BlockId) -> (i64, bool) {
            (100 - block as i64, block % 2 == 0)
        }
    }

    #[test]
    fn pops_in_nondecreasing_priority_order() {
        let mut heap = PriorityBlockHeap::with_capacity(8);
        for block in 0..8 {
            heap.enqueue(block, &ReverseDecider);
        }
        assert_eq!(heap.len(), 8);

        let mut last = i64::MIN;
        let mut seen = Vec::new();
        while let Some(entry) = heap.pop_lowest() {
            assert!(entry.priority >= last);
            last = entry.priority;
            seen.push(entry.id);
        }
        // Lowest priority value first, so the highest block id leads.
        assert_eq!(seen, vec![7, 6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn decision_is_captured_at_enqueue() {
        let mut heap = PriorityBlockHeap::default();
        heap.enqueue(4, &ReverseDecider);
        heap.enqueue(3, &ReverseDecider);
        let first = heap.pop_lowest().unwrap();
        assert_eq!(first.id, 4);
        assert!(first.from_server);
        let second = heap.pop_lowest().unwrap();
        assert_eq!(second.id, 3);
        assert!(!second.from_server);
    }

    #[test]
    fn empty_pop_is_a_typed_miss() {
        let mut heap = PriorityBlockHeap::default();
        assert!(heap.is_empty());
        assert!(heap.pop_lowest().is_none());
        heap.enqueue(0, &ReverseDecider);
        assert!(heap.pop_lowest().is_some());
        assert!(heap.pop_lowest().is_none());
    }
}
