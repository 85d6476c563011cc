use std::time::Duration;

use dpv_reconcile::{Delay, WaitOutcome};

/// Records every requested wait instead of sleeping.
///
/// `cancel_on(n)` makes the n-th wait (1-based) report `Cancelled`.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    waits: Vec<Duration>,
    cancel_on: Option<usize>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_on(n: usize) -> Self {
        Self {
            waits: Vec::new(),
            cancel_on: Some(n),
        }
    }

    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }

    pub fn total(&self) -> Duration {
        self.waits.iter().sum()
    }
}

impl Delay for RecordingDelay {
    fn wait(&mut self, duration: Duration) -> WaitOutcome {
        self.waits.push(duration);
        if self.cancel_on == Some(self.waits.len()) {
            WaitOutcome::Cancelled
        } else {
            WaitOutcome::Elapsed
        }
    }
}
