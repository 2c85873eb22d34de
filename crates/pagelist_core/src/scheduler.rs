//! Deferred callback scheduler
//!
//! A single-threaded timer queue driven by the host event loop. Time is a
//! monotonic millisecond counter that only moves when the host calls
//! [`Scheduler::advance_to`] or [`Scheduler::advance_by`], so replays and tests
//! are fully deterministic.
//!
//! Scheduling returns a [`TimerGuard`]; dropping the guard cancels the timer.
//! Components hold the guard for as long as the deferred work is meaningful,
//! which ties every pending callback to the lifetime of its owner.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    pub struct TimerId;
}

/// Monotonic time in milliseconds
pub type Timestamp = u64;

/// Callback run when a timer fires, receiving the due time
pub type TimerCallback = Box<dyn FnOnce(Timestamp) + Send>;

struct Timer {
    due: Timestamp,
    /// Insertion order, breaks ties between timers with the same due time
    seq: u64,
    callback: TimerCallback,
}

/// The timer queue behind a [`Scheduler`]
pub struct TimerQueue {
    timers: SlotMap<TimerId, Timer>,
    now: Timestamp,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            now: 0,
            next_seq: 0,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Queue a callback. Due times in the past fire on the next advance.
    pub fn schedule_at(&mut self, due: Timestamp, callback: TimerCallback) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.insert(Timer {
            due: due.max(self.now),
            seq,
            callback,
        })
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Earliest due time among pending timers
    pub fn next_due(&self) -> Option<Timestamp> {
        self.timers.values().map(|t| t.due).min()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Remove the earliest timer due at or before `until`, moving the clock to
    /// its due time
    fn pop_due(&mut self, until: Timestamp) -> Option<(Timestamp, TimerCallback)> {
        let id = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(id, _)| id)?;

        let timer = self.timers.remove(id)?;
        self.now = self.now.max(timer.due);
        Some((timer.due, timer.callback))
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a timer queue
///
/// Clones refer to the same queue and clock.
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Arc<Mutex<TimerQueue>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TimerQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current time
    pub fn now(&self) -> Timestamp {
        self.lock().now()
    }

    /// Run `callback` at an absolute time
    pub fn schedule_at<F>(&self, due: Timestamp, callback: F) -> TimerGuard
    where
        F: FnOnce(Timestamp) + Send + 'static,
    {
        let id = self.lock().schedule_at(due, Box::new(callback));
        TimerGuard {
            id,
            queue: Arc::downgrade(&self.queue),
        }
    }

    /// Run `callback` after `delay_ms` milliseconds
    pub fn schedule_after<F>(&self, delay_ms: u64, callback: F) -> TimerGuard
    where
        F: FnOnce(Timestamp) + Send + 'static,
    {
        let due = self.now().saturating_add(delay_ms);
        self.schedule_at(due, callback)
    }

    /// Advance the clock to `to`, firing due timers in order
    ///
    /// The queue lock is released while each callback runs, so callbacks may
    /// schedule or cancel timers. Returns the number of timers fired.
    pub fn advance_to(&self, to: Timestamp) -> usize {
        let mut fired = 0;
        loop {
            let next = self.lock().pop_due(to);
            match next {
                Some((due, callback)) => {
                    callback(due);
                    fired += 1;
                }
                None => break,
            }
        }

        let mut queue = self.lock();
        queue.now = queue.now.max(to);

        if fired > 0 {
            tracing::trace!("Scheduler advanced to {}ms, fired {} timers", to, fired);
        }
        fired
    }

    /// Advance the clock by `delta_ms`
    pub fn advance_by(&self, delta_ms: u64) -> usize {
        let to = self.now().saturating_add(delta_ms);
        self.advance_to(to)
    }

    /// Number of pending timers
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Earliest pending due time
    pub fn next_due(&self) -> Option<Timestamp> {
        self.lock().next_due()
    }
}

/// Owns a pending timer; dropping it cancels the timer
#[must_use = "dropping a TimerGuard cancels the timer"]
pub struct TimerGuard {
    id: TimerId,
    queue: Weak<Mutex<TimerQueue>>,
}

impl TimerGuard {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Whether the timer has neither fired nor been cancelled
    pub fn is_pending(&self) -> bool {
        self.queue
            .upgrade()
            .map(|queue| {
                queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_pending(self.id)
            })
            .unwrap_or(false)
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.upgrade() {
            queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .cancel(self.id);
        }
    }
}

impl std::fmt::Debug for TimerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerGuard").field("id", &self.id).finish()
    }
}
