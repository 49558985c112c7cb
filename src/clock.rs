//! Session clock and one-shot timers.
//!
//! Timers never call back on their own. The session asks the queue which
//! tokens are due (`take_due`) and feeds them through the same serial path as
//! every other event. Each token carries a generation that is unique for the
//! lifetime of the queue, so a state can tell its own timer apart from a stale
//! one even if cancellation raced with expiry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source, measured from an arbitrary session origin.
pub trait Clock: Send {
    fn now(&self) -> Duration;
}

/// Wall-clock backed by `Instant`
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle while the
/// session owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Handle to a scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken {
    generation: u64,
}

impl TimerToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Pending one-shot timers ordered by deadline.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_generation: u64,
    // (deadline, generation) keeps same-deadline timers in scheduling order
    pending: BTreeMap<(Duration, u64), TimerToken>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Duration, delay: Duration) -> TimerToken {
        self.next_generation += 1;
        let token = TimerToken {
            generation: self.next_generation,
        };
        self.pending.insert((now + delay, token.generation), token);
        token
    }

    /// Returns false when the timer already fired or was cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let key = self
            .pending
            .iter()
            .find(|(_, t)| **t == token)
            .map(|(k, _)| *k);
        match key {
            Some(k) => self.pending.remove(&k).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.values().any(|t| *t == token)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return every timer whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Duration) -> Vec<TimerToken> {
        let later = self.pending.split_off(&(now, u64::MAX));
        let due = std::mem::replace(&mut self.pending, later);
        due.into_values().collect()
    }
}
