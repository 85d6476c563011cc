//! Harness config to engine settings.

use anyhow::{anyhow, Result};
use dpv_config::{BackoffKind, HarnessConfig};
use dpv_reconcile::{ComparisonRange, RetryPolicy};

use crate::{ActionTrigger, ScenarioConfig};

pub fn retry_policy(cfg: &HarnessConfig) -> RetryPolicy {
    match cfg.reconcile.backoff {
        BackoffKind::Fixed => RetryPolicy::fixed(cfg.reconcile.max_attempts, cfg.retry_delay()),
        BackoffKind::Exponential => RetryPolicy::exponential(
            cfg.reconcile.max_attempts,
            cfg.retry_delay(),
            cfg.max_retry_delay(),
        ),
    }
}

pub fn comparison_range(cfg: &HarnessConfig) -> Result<ComparisonRange> {
    ComparisonRange::parse(&cfg.reconcile.comparison_range).ok_or_else(|| {
        anyhow!(
            "unknown comparison range '{}'",
            cfg.reconcile.comparison_range
        )
    })
}

impl ScenarioConfig {
    pub fn from_harness(cfg: &HarnessConfig) -> Result<Self> {
        Ok(Self {
            stream: cfg.stream_id()?,
            kind: cfg.stream.kind,
            marker: cfg.console.marker.clone(),
            batches: cfg.scenario.batches,
            batch_timeout: cfg.batch_timeout(),
            thread_timeout: cfg.thread_timeout(),
            settle: cfg.settle(),
            wait_thread_finished: cfg.scenario.wait_thread_finished,
            trigger: cfg.scenario.trigger.as_ref().map(|t| ActionTrigger {
                target: t.target.clone(),
                payload: t.payload.clone(),
                expected_reply: t.expected_reply.trim().to_string(),
            }),
        })
    }
}
