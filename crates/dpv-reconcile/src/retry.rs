//! Attempt cap, backoff schedule and the delay between attempts.
//!
//! The delay is injected so tests run without wall-clock waits, and so a
//! long backoff can be cut short from another thread.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// Doubles after every failed attempt, capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total fetch attempts, including the first one. Never below 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::MAX_ATTEMPTS,
            backoff: Backoff::Fixed(crate::RETRY_DELAY),
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn exponential(max_attempts: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Exponential { initial, max },
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait after the failed attempt `ordinal` (1-based).
    pub fn delay_after(&self, ordinal: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { initial, max } => {
                let shift = ordinal.saturating_sub(1).min(31);
                initial
                    .checked_mul(1u32 << shift)
                    .map(|d| d.min(max))
                    .unwrap_or(max)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

/// Something that can wait between attempts.
pub trait Delay {
    fn wait(&mut self, duration: Duration) -> WaitOutcome;
}

impl<T: Delay + ?Sized> Delay for &mut T {
    fn wait(&mut self, duration: Duration) -> WaitOutcome {
        (**self).wait(duration)
    }
}

/// Blocking sleep; never cancelled.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleep;

impl Delay for ThreadSleep {
    fn wait(&mut self, duration: Duration) -> WaitOutcome {
        thread::sleep(duration);
        WaitOutcome::Elapsed
    }
}

type CancelFlag = Arc<(Mutex<bool>, Condvar)>;

/// Blocking wait that returns early once its [`CancelHandle`] fires.
///
/// Cancellation is sticky: every later wait returns `Cancelled` at once.
#[derive(Debug, Default)]
pub struct CancellableDelay {
    flag: CancelFlag,
}

/// Cancels the [`CancellableDelay`] it was taken from. Cheap to clone and
/// safe to use from any thread.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    flag: CancelFlag,
}

impl CancellableDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.flag),
        }
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        let (lock, cv) = &*self.flag;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cv.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Delay for CancellableDelay {
    fn wait(&mut self, duration: Duration) -> WaitOutcome {
        let (lock, cv) = &*self.flag;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (cancelled, _) = cv
            .wait_timeout_while(guard, duration, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        if *cancelled {
            WaitOutcome::Cancelled
        } else {
            WaitOutcome::Elapsed
        }
    }
}
