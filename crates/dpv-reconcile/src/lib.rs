//! dpv-reconcile
//!
//! Confirms that what the device printed on its console is what the cloud
//! stored.
//!
//! - Fetch the most recent `n` records descending, reverse to emission order,
//!   pair index by index with the console records.
//! - Compare with a named strategy: `ScalarFields` (data, quality, location)
//!   or `BinaryChecksum` (CRC-32 of the decoded payload only).
//! - Fetch errors and mismatches both consume an attempt. Attempts are capped
//!   and separated by an injected, cancellable delay.
//!
//! No persistent state. Cleanup after a failed verification belongs to the
//! caller.

mod checksum;
mod engine;
mod retry;
mod strategy;
mod types;

pub use checksum::{crc32, decode_payload, Checksum};
pub use engine::{ComparisonRange, Reconciler, MAX_ATTEMPTS, RETRY_DELAY};
pub use retry::{Backoff, CancelHandle, CancellableDelay, Delay, RetryPolicy, ThreadSleep, WaitOutcome};
pub use strategy::{BinaryChecksum, CompareStrategy, ScalarFields};
pub use types::*;
