use std::time::Duration;

use dpv_cloud::RecordFetcher;
use dpv_schemas::{CloudRecord, ConsoleRecord, FetchOrder, StreamId};
use tracing::{error, info, warn};

use crate::retry::{Delay, RetryPolicy, ThreadSleep, WaitOutcome};
use crate::strategy::{BinaryChecksum, CompareStrategy, ScalarFields};
use crate::{AttemptOutcome, Field, Mismatch, ReconcileReport, ReconciliationAttempt, Verdict};

/// Fetch attempts per reconciliation.
pub const MAX_ATTEMPTS: u32 = 3;

/// Fixed wait between attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// How many of the uploaded records are compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ComparisonRange {
    #[default]
    Full,
    /// Skip the most recent record. Only for device firmware whose last
    /// upload of a batch lands after the batch terminator is printed.
    AllButLast,
}

impl ComparisonRange {
    pub fn compared(&self, uploaded: usize) -> usize {
        match self {
            ComparisonRange::Full => uploaded,
            ComparisonRange::AllButLast => uploaded.saturating_sub(1),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Some(ComparisonRange::Full),
            "all_but_last" | "all-but-last" => Some(ComparisonRange::AllButLast),
            _ => None,
        }
    }
}

/// Bounded fetch+compare loop over one cloud session.
pub struct Reconciler<F, D = ThreadSleep> {
    fetcher: F,
    delay: D,
    policy: RetryPolicy,
    range: ComparisonRange,
}

impl<F: RecordFetcher> Reconciler<F, ThreadSleep> {
    pub fn new(fetcher: F) -> Self {
        Self::with_delay(fetcher, ThreadSleep)
    }
}

impl<F: RecordFetcher, D: Delay> Reconciler<F, D> {
    pub fn with_delay(fetcher: F, delay: D) -> Self {
        Self {
            fetcher,
            delay,
            policy: RetryPolicy::default(),
            range: ComparisonRange::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_range(mut self, range: ComparisonRange) -> Self {
        self.range = range;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn range(&self) -> ComparisonRange {
        self.range
    }

    pub fn fetcher_mut(&mut self) -> &mut F {
        &mut self.fetcher
    }

    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    pub fn into_parts(self) -> (F, D) {
        (self.fetcher, self.delay)
    }

    /// Verify scalar records field by field.
    pub fn reconcile(&mut self, stream: &StreamId, records: &[ConsoleRecord]) -> ReconcileReport {
        self.reconcile_with(&ScalarFields, stream, records)
    }

    /// Verify binary records by payload checksum.
    pub fn reconcile_binary(
        &mut self,
        stream: &StreamId,
        records: &[ConsoleRecord],
    ) -> ReconcileReport {
        self.reconcile_with(&BinaryChecksum, stream, records)
    }

    pub fn reconcile_with(
        &mut self,
        strategy: &dyn CompareStrategy,
        stream: &StreamId,
        records: &[ConsoleRecord],
    ) -> ReconcileReport {
        let mut report = ReconcileReport {
            stream: stream.clone(),
            strategy: strategy.name(),
            verdict: Verdict::Exhausted,
            attempts: Vec::new(),
            diagnostic: None,
        };

        if records.is_empty() {
            info!(%stream, "no console records to verify");
            report.verdict = Verdict::Verified;
            return report;
        }

        let max_attempts = self.policy.attempts();
        for ordinal in 1..=max_attempts {
            let attempt = self.attempt(strategy, stream, records, ordinal, max_attempts);
            let failed = attempt.outcome != AttemptOutcome::Success;
            if let Some(detail) = &attempt.detail {
                report.diagnostic = Some(detail.clone());
            }
            report.attempts.push(attempt);

            if !failed {
                info!(
                    %stream,
                    strategy = strategy.name(),
                    attempt = ordinal,
                    "{} records verified",
                    records.len()
                );
                report.verdict = Verdict::Verified;
                return report;
            }

            if ordinal < max_attempts {
                let wait = self.policy.delay_after(ordinal);
                if self.delay.wait(wait) == WaitOutcome::Cancelled {
                    warn!(%stream, attempt = ordinal, "retry wait cancelled");
                    report.verdict = Verdict::Cancelled;
                    return report;
                }
            }
        }

        error!(
            %stream,
            strategy = strategy.name(),
            attempts = max_attempts,
            diagnostic = report.diagnostic.as_deref().unwrap_or_default(),
            "verification failed"
        );
        report
    }

    fn attempt(
        &mut self,
        strategy: &dyn CompareStrategy,
        stream: &StreamId,
        records: &[ConsoleRecord],
        ordinal: u32,
        max_attempts: u32,
    ) -> ReconciliationAttempt {
        let uploaded = records.len();

        let mut page = match self.fetcher.fetch(stream, uploaded, FetchOrder::Descending) {
            Ok(page) => page,
            Err(e) => {
                let detail = format!("fetch failed: {e}");
                warn!(%stream, attempt = ordinal, max_attempts, %detail, "attempt failed");
                return ReconciliationAttempt {
                    ordinal,
                    outcome: AttemptOutcome::FetchError,
                    detail: Some(detail),
                };
            }
        };

        // Most recent first; keep the newest `uploaded` and restore emission order.
        page.truncate(uploaded);
        page.reverse();

        match compare_pairs(strategy, records, &page, self.range.compared(uploaded)) {
            None => ReconciliationAttempt {
                ordinal,
                outcome: AttemptOutcome::Success,
                detail: None,
            },
            Some(m) => {
                warn!(
                    %stream,
                    attempt = ordinal,
                    max_attempts,
                    record = m.index,
                    field = m.field.as_str(),
                    console = %m.console_dump,
                    cloud = %m.cloud_dump,
                    "attempt failed: {m}"
                );
                ReconciliationAttempt {
                    ordinal,
                    outcome: AttemptOutcome::FieldMismatch,
                    detail: Some(m.to_string()),
                }
            }
        }
    }
}

/// First mismatch among the first `compared` index-aligned pairs.
fn compare_pairs(
    strategy: &dyn CompareStrategy,
    console: &[ConsoleRecord],
    cloud: &[CloudRecord],
    compared: usize,
) -> Option<Mismatch> {
    if cloud.len() < console.len() {
        return Some(Mismatch {
            index: cloud.len(),
            field: Field::Count,
            console: console.len().to_string(),
            cloud: cloud.len().to_string(),
            console_dump: format!("{console:?}"),
            cloud_dump: format!("{cloud:?}"),
        });
    }

    console
        .iter()
        .zip(cloud)
        .take(compared)
        .enumerate()
        .find_map(|(i, (ours, theirs))| strategy.compare(i, ours, theirs).err())
}
