//! dpv-runtime
//!
//! Drives one verification scenario against a device:
//!
//! 1. optionally send a device request that starts the upload, and require
//!    the expected reply
//! 2. per batch: read the console up to the batch terminator, let the cloud
//!    settle, reconcile with the strategy for the stream's record kind
//! 3. optionally wait for the device to report its upload thread finished
//!
//! An attached connection monitor keeps polling for the whole run; what it
//! saw is part of the report.
//!
//! Any failure deletes the stream under test before the error is returned.
//! A failed delete is logged, never escalated.

mod scenario;
mod wiring;

pub use scenario::{
    ActionTrigger, ConnectionSummary, Scenario, ScenarioConfig, ScenarioError, ScenarioReport,
    Stage,
};
pub use wiring::{comparison_range, retry_policy};
