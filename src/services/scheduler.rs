//! Cancellable virtual-clock timer queue
//!
//! Every demo widget owns one `Scheduler`. Time only moves when the owner
//! advances it, so tests drive the clock deterministically and the session
//! registry drives it from wall time.
//!
//! Firing order is (deadline, registration order). A timer scheduled while an
//! event is being handled is relative to that event's deadline, not to the
//! target the clock is being advanced to, so chained phases never drift.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Handle returned by `schedule`, used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

pub struct Scheduler<E> {
    now_ms: u64,
    next_seq: u64,
    /// Pending events keyed by (deadline, sequence)
    queue: BTreeMap<(u64, u64), E>,
    /// Sequence -> deadline, for O(log n) cancellation
    deadlines: FxHashMap<u64, u64>,
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self { now_ms: 0, next_seq: 0, queue: BTreeMap::new(), deadlines: FxHashMap::default() }
    }

    /// Current virtual time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedule `event` to fire `delay_ms` after the current virtual time
    pub fn schedule(&mut self, delay_ms: u64, event: E) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;

        let deadline = self.now_ms.saturating_add(delay_ms);
        self.queue.insert((deadline, seq), event);
        self.deadlines.insert(seq, deadline);
        TimerId(seq)
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id.0) {
            Some(deadline) => self.queue.remove(&(deadline, id.0)).is_some(),
            None => false,
        }
    }

    /// Cancel everything still pending, returning how many timers were dropped
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.queue.len();
        self.queue.clear();
        self.deadlines.clear();
        cancelled
    }

    /// Number of timers still waiting to fire
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Absolute virtual time of the earliest pending timer
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest event due at or before `until_ms`.
    ///
    /// The clock moves to the event's deadline so that anything scheduled by
    /// its handler is measured from the moment it fired.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<E> {
        let (&(deadline, seq), _) = self.queue.iter().next()?;
        if deadline > until_ms {
            return None;
        }

        let event = self.queue.remove(&(deadline, seq))?;
        self.deadlines.remove(&seq);
        self.now_ms = self.now_ms.max(deadline);
        Some(event)
    }

    /// Move the clock to `until_ms` once every due event has been handled
    pub fn settle(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A widget whose state changes are driven by its own `Scheduler`
pub trait TimerDriven {
    type Event;

    fn timers(&self) -> &Scheduler<Self::Event>;

    fn timers_mut(&mut self) -> &mut Scheduler<Self::Event>;

    /// Apply one fired event
    fn on_timer(&mut self, event: Self::Event);

    /// Advance this widget's clock, firing every event that falls due in order
    fn advance(&mut self, elapsed_ms: u64) {
        let target = self.timers().now_ms().saturating_add(elapsed_ms);
        while let Some(event) = self.timers_mut().pop_due(target) {
            self.on_timer(event);
        }
        self.timers_mut().settle(target);
    }

    /// Cancel all pending timers; the widget keeps its last state
    fn cancel_timers(&mut self) -> usize {
        self.timers_mut().cancel_all()
    }
}
