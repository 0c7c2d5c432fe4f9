use std::time::{Duration, Instant};

#[derive(Debug)]
struct Pending<T> {
    due_at: Instant,
    value: T,
}

/// Single-slot, last-write-wins delayed task.
///
/// Scheduling replaces whatever was pending. Time is passed in by the caller,
/// so the owner decides when to [`Debouncer::poll`].
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Start the delay over from `now`. Returns the task this one replaced.
    pub fn schedule(&mut self, now: Instant, value: T) -> Option<T> {
        let previous = self.pending.replace(Pending {
            due_at: now + self.delay,
            value,
        });
        previous.map(|p| p.value)
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due_at)
    }

    /// Take the pending task once its delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.as_ref()?.due_at > now {
            return None;
        }
        self.cancel()
    }
}
