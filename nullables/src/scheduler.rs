//! Nullable scheduler: virtual time for guard timers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;
use std::time::Duration;

use kyc_verification::{Scheduler, Task, TimerHandle};

struct Pending {
    id: u64,
    due: Duration,
    handle: TimerHandle,
    task: Task,
}

/// A timer that ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FiredTimer {
    pub label: &'static str,
    pub at: Duration,
    pub panicked: bool,
}

#[derive(Default)]
struct Inner {
    now: Duration,
    next_id: u64,
    pending: Vec<Pending>,
    fired: Vec<FiredTimer>,
}

/// A deterministic scheduler for testing.
///
/// Nothing runs until [`advance`](Self::advance) moves virtual time past a
/// task's deadline. Tasks run in deadline order (ties in scheduling order),
/// outside the internal lock, and a panicking task does not stop the others.
#[derive(Default)]
pub struct NullScheduler {
    inner: Mutex<Inner>,
}

impl NullScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed so far.
    pub fn now(&self) -> Duration {
        self.inner.lock().unwrap().now
    }

    /// Move virtual time forward, running every task that falls due.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        while let Some(next) = self.pop_due(target) {
            let result = catch_unwind(AssertUnwindSafe(next.task));
            if result.is_err() {
                let mut inner = self.inner.lock().unwrap();
                if let Some(last) = inner.fired.last_mut() {
                    last.panicked = true;
                }
            }
        }
        self.inner.lock().unwrap().now = target;
    }

    fn pop_due(&self, target: Duration) -> Option<Pending> {
        let mut inner = self.inner.lock().unwrap();
        inner.pending.retain(|p| !p.handle.is_cancelled());
        let index = inner
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= target)
            .min_by_key(|(_, p)| (p.due, p.id))
            .map(|(i, _)| i)?;
        let next = inner.pending.swap_remove(index);
        inner.now = next.due;
        let fired = FiredTimer {
            label: next.handle.label(),
            at: next.due,
            panicked: false,
        };
        inner.fired.push(fired);
        Some(next)
    }

    /// Labels of every timer that ran, in order.
    pub fn fired(&self) -> Vec<&'static str> {
        self.inner.lock().unwrap().fired.iter().map(|f| f.label).collect()
    }

    pub fn fired_timers(&self) -> Vec<FiredTimer> {
        self.inner.lock().unwrap().fired.clone()
    }

    /// How many times a timer with `label` ran.
    pub fn fire_count(&self, label: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .fired
            .iter()
            .filter(|f| f.label == label)
            .count()
    }

    /// Labels of timers still waiting and not cancelled.
    pub fn pending(&self) -> Vec<&'static str> {
        let inner = self.inner.lock().unwrap();
        let mut pending: Vec<_> = inner
            .pending
            .iter()
            .filter(|p| !p.handle.is_cancelled())
            .map(|p| (p.due, p.id, p.handle.label()))
            .collect();
        pending.sort();
        pending.into_iter().map(|(_, _, label)| label).collect()
    }
}

impl Scheduler for NullScheduler {
    fn schedule(&self, label: &'static str, delay: Duration, task: Task) -> TimerHandle {
        let handle = TimerHandle::new(label);
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let pending = Pending {
            id: inner.next_id,
            due: inner.now + delay,
            handle: handle.clone(),
            task,
        };
        inner.pending.push(pending);
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn runs_due_tasks_in_order() {
        let scheduler = NullScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for (label, secs) in [("b", 2), ("a", 1), ("c", 3)] {
            let log = log.clone();
            scheduler.schedule(label, Duration::from_secs(secs), Box::new(move || {
                log.lock().unwrap().push(label);
            }));
        }

        scheduler.advance(Duration::from_secs(2));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(scheduler.pending(), vec!["c"]);
        assert_eq!(scheduler.now(), Duration::from_secs(2));
    }

    #[test]
    fn cancelled_tasks_do_not_fire() {
        let scheduler = NullScheduler::new();
        let handle = scheduler.schedule("x", Duration::from_secs(1), Box::new(|| {}));
        handle.cancel();
        scheduler.advance(Duration::from_secs(5));
        assert!(scheduler.fired().is_empty());
    }

    #[test]
    fn panicking_task_does_not_stop_later_tasks() {
        let scheduler = NullScheduler::new();
        scheduler.schedule("boom", Duration::from_secs(1), Box::new(|| panic!("boom")));
        scheduler.schedule("after", Duration::from_secs(2), Box::new(|| {}));
        scheduler.advance(Duration::from_secs(3));
        let fired = scheduler.fired_timers();
        assert_eq!(fired.len(), 2);
        assert!(fired[0].panicked);
        assert!(!fired[1].panicked);
    }

    #[test]
    fn tasks_may_schedule_more_tasks() {
        let scheduler = Arc::new(NullScheduler::new());
        let inner = scheduler.clone();
        scheduler.schedule("outer", Duration::from_secs(1), Box::new(move || {
            inner.schedule("inner", Duration::from_secs(1), Box::new(|| {}));
        }));
        scheduler.advance(Duration::from_secs(2));
        assert_eq!(scheduler.fired(), vec!["outer", "inner"]);
    }
}
