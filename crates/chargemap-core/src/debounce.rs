//! Trailing-edge debouncer driven by caller-supplied time.
//!
//! The debouncer never reads the clock itself: every operation takes the
//! current [`Instant`], so callers can drive it from a runtime timer and tests
//! can advance virtual time deterministically.

use std::time::{Duration, Instant};

/// Delay applied to search input before it takes effect.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Records `value` as the latest input, replacing any pending value and
    /// restarting the delay from `now`.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            value,
            deadline: now + self.delay,
        });
    }

    /// Releases the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self.pending.as_ref().is_some_and(|p| now >= p.deadline);
        if due {
            self.pending.take().map(|p| p.value)
        } else {
            None
        }
    }

    /// Drops the pending value without releasing it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    /// Releases the pending value immediately, ignoring the deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn releases_value_only_after_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(300 * MS);
        debouncer.push("a", start);

        assert_eq!(debouncer.poll(start + 299 * MS), None);
        assert_eq!(debouncer.poll(start + 300 * MS), Some("a"));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + 900 * MS), None);
    }

    #[test]
    fn new_input_restarts_the_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        debouncer.push("al", start);
        debouncer.push("alp", start + 200 * MS);

        assert_eq!(debouncer.poll(start + 350 * MS), None);
        assert_eq!(debouncer.deadline(), Some(start + 500 * MS));
        assert_eq!(debouncer.poll(start + 500 * MS), Some("alp"));
    }

    #[test]
    fn cancel_discards_pending_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(100 * MS);
        debouncer.push(1, start);
        assert_eq!(debouncer.cancel(), Some(1));
        assert_eq!(debouncer.poll(start + 200 * MS), None);
    }

    #[test]
    fn flush_releases_before_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(100 * MS);
        debouncer.push(7, start);
        assert_eq!(debouncer.flush(), Some(7));
        assert_eq!(debouncer.flush(), None);
    }

    #[test]
    fn default_delay_is_search_delay() {
        let debouncer: Debouncer<String> = Debouncer::default();
        assert_eq!(debouncer.delay(), SEARCH_DEBOUNCE);
    }
}
