//! Round-robin selection within the duty and other partitions.

use std::sync::Mutex;
use std::time::Instant;

use crate::file::BlockId;

/// External policy deciding block ownership and reporting topology drift.
pub trait DutyDecider: Send + Sync {
    /// True if the cluster topology changed after `since`, invalidating
    /// any partition computed at that time.
    fn changed_since(&self, since: Instant) -> bool;

    /// True if this node is primarily responsible for `block`.
    fn is_duty_block(&self, block: BlockId) -> bool;
}

#[derive(Clone, Copy)]
enum Partition {
    Duty,
    Other,
}

struct Inner {
    marks: Vec<bool>,
    duties: Vec<BlockId>,
    duty_cursor: usize,
    others: Vec<BlockId>,
    other_cursor: usize,
    last_refresh: Instant,
}

/// Classifies every block of a file as duty or other and serves each
/// partition in strict insertion order, wrapping around.
///
/// Blocks flagged via `mark_done` are purged lazily, in a batch when a
/// cursor wraps, so marking stays cheap relative to a full refresh. A
/// refresh reclassifies only unmarked blocks and swaps both lists, both
/// cursors, and the timestamp together under the lock, so readers never
/// observe a half-updated partition.
pub struct DutyPartitioner<D> {
    decider: D,
    inner: Mutex<Inner>,
}

impl<D: DutyDecider> DutyPartitioner<D> {
    pub fn new(decider: D, block_count: usize) -> Self {
        let mut inner = Inner {
            marks: vec![false; block_count],
            duties: Vec::new(),
            duty_cursor: 0,
            others: Vec::new(),
            other_cursor: 0,
            last_refresh: Instant::now(),
        };
        refresh(&mut inner, &decider);
        Self {
            decider,
            inner: Mutex::new(inner),
        }
    }

    /// Next duty block in rotation, or `None` when the duty partition is
    /// exhausted for this pass.
    pub fn select_duty(&self) -> Option<BlockId> {
        self.select(Partition::Duty)
    }

    /// Next other block in rotation, or `None` when the other partition
    /// is exhausted for this pass.
    pub fn select_other(&self) -> Option<BlockId> {
        self.select(Partition::Other)
    }

    /// Flag `block` as finished. It stays in its list until the next
    /// cursor wraparound purges it, and a later refresh will not
    /// reintroduce it.
    pub fn mark_done(&self, block: BlockId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(mark) = inner.marks.get_mut(block) {
            *mark = true;
        }
    }

    fn select(&self, partition: Partition) -> Option<BlockId> {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        if self.decider.changed_since(inner.last_refresh) {
            refresh(inner, &self.decider);
        }

        let marks = &inner.marks;
        let (list, cursor) = match partition {
            Partition::Duty => (&mut inner.duties, &mut inner.duty_cursor),
            Partition::Other => (&mut inner.others, &mut inner.other_cursor),
        };
        if list.is_empty() {
            return None;
        }
        if *cursor >= list.len() {
            // Wraparound: purge finished blocks, then start over.
            list.retain(|&block| !marks[block]);
            *cursor = 0;
        }
        if *cursor >= list.len() {
            return None;
        }
        let block = list[*cursor];
        *cursor += 1;
        Some(block)
    }
}

/// Rebuild both partitions from the decider, skipping finished blocks.
/// Caller holds the lock, so the swap is atomic to readers.
fn refresh<D: DutyDecider>(inner: &mut Inner, decider: &D) {
    let mut duties = Vec::with_capacity(inner.marks.len());
    let mut others = Vec::with_capacity(inner.marks.len());
    for block in 0..inner.marks.len() {
        if inner.marks[block] {
            continue;
        }
        if decider.is_duty_block(block) {
            duties.push(block);
        } else {
            others.push(block);
        }
    }
    inner.duties = duties;
    inner.others = others;
    inner.duty_cursor = 0;
    inner.other_cursor = 0;
    inner.last_refresh = Instant::now();
}
