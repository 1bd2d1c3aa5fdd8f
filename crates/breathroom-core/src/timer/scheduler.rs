//! Deferred re-entry points for the session engine.
//!
//! Nothing here sleeps or spawns. The host asks for [`Scheduler::next_due`],
//! waits however it likes, then drains due wakeups with
//! [`Scheduler::pop_due`]. Cancelled handles never fire.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use serde::{Deserialize, Serialize};

/// What the engine should do when a scheduled time arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wakeup {
    /// One second of the start countdown elapsed.
    Countdown,
    /// Next render frame.
    Frame,
    /// The pause between two combo routines is over.
    TransitionEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskHandle(u64);

#[derive(Debug)]
struct Scheduled {
    due_ms: u64,
    handle: TaskHandle,
    wakeup: Wakeup,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.handle == other.handle
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Min-heap on due time, FIFO among equal times.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.handle.cmp(&self.handle))
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    pending: BinaryHeap<Scheduled>,
    cancelled: HashSet<TaskHandle>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `wakeup` to fire at `due_ms`.
    pub fn schedule(&mut self, wakeup: Wakeup, due_ms: u64) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Scheduled {
            due_ms,
            handle,
            wakeup,
        });
        handle
    }

    /// Cancel a pending wakeup. Returns `false` if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let live = self.pending.iter().any(|s| s.handle == handle);
        live && self.cancelled.insert(handle)
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
        self.cancelled.clear();
    }

    /// Pop the earliest wakeup due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TaskHandle, Wakeup)> {
        loop {
            let due = self.pending.peek()?.due_ms;
            if due > now_ms {
                return None;
            }
            let scheduled = self.pending.pop()?;
            if self.cancelled.remove(&scheduled.handle) {
                continue;
            }
            return Some((scheduled.handle, scheduled.wakeup));
        }
    }

    /// Due time of the earliest live wakeup.
    pub fn next_due(&self) -> Option<u64> {
        self.pending
            .iter()
            .filter(|s| !self.cancelled.contains(&s.handle))
            .map(|s| s.due_ms)
            .min()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len() - self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule(Wakeup::Frame, 300);
        s.schedule(Wakeup::Countdown, 100);
        s.schedule(Wakeup::TransitionEnd, 200);

        assert_eq!(s.next_due(), Some(100));
        assert_eq!(s.pop_due(50), None);
        assert_eq!(s.pop_due(250).map(|(_, w)| w), Some(Wakeup::Countdown));
        assert_eq!(s.pop_due(250).map(|(_, w)| w), Some(Wakeup::TransitionEnd));
        assert_eq!(s.pop_due(250), None);
        assert_eq!(s.pending_count(), 1);
    }

    #[test]
    fn equal_due_times_fire_in_schedule_order() {
        let mut s = Scheduler::new();
        let a = s.schedule(Wakeup::Frame, 10);
        let b = s.schedule(Wakeup::Countdown, 10);
        assert_eq!(s.pop_due(10).map(|(h, _)| h), Some(a));
        assert_eq!(s.pop_due(10).map(|(h, _)| h), Some(b));
    }

    #[test]
    fn cancelled_wakeups_never_fire() {
        let mut s = Scheduler::new();
        let frame = s.schedule(Wakeup::Frame, 10);
        assert!(s.cancel(frame));
        assert!(!s.cancel(frame));
        assert_eq!(s.next_due(), None);
        assert!(s.is_empty());
        assert_eq!(s.pop_due(1_000), None);
    }

    #[test]
    fn cancel_all_drops_everything() {
        let mut s = Scheduler::new();
        s.schedule(Wakeup::Countdown, 1_000);
        s.schedule(Wakeup::Frame, 16);
        s.cancel_all();
        assert_eq!(s.pop_due(u64::MAX), None);
    }
}
