use std::time::{Duration, Instant};

/// A single-slot debounce timer.
///
/// At most one operation is pending at any time; scheduling a new one replaces the previous one.
/// Time is never read from the system clock: callers pass `now` explicitly and fire due operations
/// with [`Debouncer::poll`].
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    pending: Option<Pending<T>>,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    due: Instant,
    payload: T,
}

impl<T> Debouncer<T> {
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Schedule `payload` to fire `delay` after `now`, returning what was superseded.
    pub fn schedule(&mut self, now: Instant, delay: Duration, payload: T) -> Option<T> {
        let due = deadline(now, delay);
        self.pending
            .replace(Pending { due, payload })
            .map(|pending| pending.payload)
    }

    /// Cancel the pending operation, if any.
    #[inline]
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.payload)
    }

    /// Take the pending operation when it is due.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.due().is_some_and(|due| due <= now) {
            self.cancel()
        } else {
            None
        }
    }

    #[inline]
    pub fn due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.due)
    }

    #[inline]
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|pending| &pending.payload)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// `now + delay`, clamped to the latest instant the platform can represent.
pub fn deadline(now: Instant, delay: Duration) -> Instant {
    let mut delay = delay;
    loop {
        if let Some(due) = now.checked_add(delay) {
            return due;
        }
        delay /= 2;
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new()
    }
}
