//! Deferred action bookkeeping for the authoritative world.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BinaryHeap},
    time::Duration,
};

/// Handle identifying a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TimerId(u64);

/// Min-heap of deferred actions keyed by due instant and scheduling order.
///
/// Cancelled timers stay in the heap until they surface and are then skipped,
/// so cancellation is constant time.
#[derive(Debug)]
pub(crate) struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<(Duration, TimerId)>>,
    live: BTreeMap<TimerId, T>,
    next_id: u64,
}

impl<T> TimerQueue<T> {
    /// Creates an empty queue with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Arms a timer that fires once the clock reaches `due`.
    pub(crate) fn schedule(&mut self, due: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.heap.push(Reverse((due, id)));
        let _ = self.live.insert(id, payload);
        id
    }

    /// Disarms a timer. Returns `false` when it already fired or was cancelled.
    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        self.live.remove(&id).is_some()
    }

    /// Disarms every pending timer.
    pub(crate) fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }

    /// Removes the earliest live timer due at or before `now`.
    ///
    /// Timers sharing a due instant fire in scheduling order.
    pub(crate) fn pop_due(&mut self, now: Duration) -> Option<(Duration, T)> {
        while let Some(Reverse((due, id))) = self.heap.peek().copied() {
            if due > now {
                return None;
            }
            let _ = self.heap.pop();
            if let Some(payload) = self.live.remove(&id) {
                return Some((due, payload));
            }
        }
        None
    }

    /// Number of timers still armed.
    pub(crate) fn len(&self) -> usize {
        self.live.len()
    }
}
