//! Virtual millisecond clock driving periodic and one-shot tasks.
//!
//! Nothing here sleeps. The owner advances time explicitly and receives due
//! tasks one at a time, in due order, so a test can replay any interleaving
//! without real timers.

use std::collections::BTreeMap;

/// Handle to a scheduled task, used to cancel it before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle {
    due_ms: u64,
    seq: u64,
}

impl TimerHandle {
    pub fn due_ms(&self) -> u64 {
        self.due_ms
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    task: T,
    period_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Clock<T> {
    now_ms: u64,
    next_seq: u64,
    queue: BTreeMap<TimerHandle, Entry<T>>,
}

impl<T: Clone> Clock<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            queue: BTreeMap::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Fires `task` every `period_ms`, first at `now + period_ms`.
    pub fn every(&mut self, period_ms: u64, task: T) -> TimerHandle {
        let period_ms = period_ms.max(1);
        self.insert(self.now_ms + period_ms, task, Some(period_ms))
    }

    /// Fires `task` once, `delay_ms` from now.
    pub fn after(&mut self, delay_ms: u64, task: T) -> TimerHandle {
        self.insert(self.now_ms + delay_ms, task, None)
    }

    /// Returns true when the task was still pending.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.queue.remove(&handle).is_some()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Pops the earliest task due at or before `until_ms`, moving the clock to
    /// its due time. Periodic tasks are re-armed before being returned.
    pub fn next_due(&mut self, until_ms: u64) -> Option<T> {
        let (&handle, _) = self.queue.iter().next()?;
        if handle.due_ms > until_ms {
            return None;
        }
        let entry = self.queue.remove(&handle)?;
        self.now_ms = self.now_ms.max(handle.due_ms);
        if let Some(period_ms) = entry.period_ms {
            self.insert(handle.due_ms + period_ms, entry.task.clone(), Some(period_ms));
        }
        Some(entry.task)
    }

    /// Moves the clock forward with no task dispatch. Never moves backwards.
    pub fn settle(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }

    fn insert(&mut self, due_ms: u64, task: T, period_ms: Option<u64>) -> TimerHandle {
        let handle = TimerHandle {
            due_ms,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.queue.insert(handle, Entry { task, period_ms });
        handle
    }
}

impl<T: Clone> Default for Clock<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(clock: &mut Clock<&'static str>, until: u64) -> Vec<(u64, &'static str)> {
        let mut fired = Vec::new();
        while let Some(task) = clock.next_due(until) {
            fired.push((clock.now_ms(), task));
        }
        clock.settle(until);
        fired
    }

    #[test]
    fn test_periodic_task_fires_each_period() {
        let mut clock = Clock::new();
        clock.every(100, "tick");
        let fired = drain(&mut clock, 350);
        assert_eq!(fired, vec![(100, "tick"), (200, "tick"), (300, "tick")]);
        assert_eq!(clock.now_ms(), 350);
    }

    #[test]
    fn test_tasks_fire_in_due_order() {
        let mut clock = Clock::new();
        clock.every(200, "sweep");
        clock.after(150, "once");
        clock.after(200, "late");
        let fired = drain(&mut clock, 200);
        assert_eq!(fired, vec![(150, "once"), (200, "sweep"), (200, "late")]);
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        let mut clock = Clock::new();
        let handle = clock.after(50, "expire");
        assert!(clock.cancel(handle));
        assert!(!clock.cancel(handle));
        assert!(drain(&mut clock, 100).is_empty());
    }

    #[test]
    fn test_one_shot_fires_exactly_once() {
        let mut clock = Clock::new();
        clock.after(10, "victory");
        assert_eq!(drain(&mut clock, 1_000).len(), 1);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_delay_is_relative_to_current_time() {
        let mut clock = Clock::new();
        clock.settle(500);
        let handle = clock.after(20, "x");
        assert_eq!(handle.due_ms(), 520);
    }
}
