use std::fmt;

use dpv_schemas::StreamId;
use serde::Serialize;

/// Field named in a mismatch. `Kind`, `Payload` and `Count` describe
/// disagreements that are not about a single record value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Data,
    Quality,
    Location,
    Crc32Decimal,
    Crc32Hex,
    /// Console record shape does not fit the comparison strategy.
    Kind,
    /// Cloud payload could not be decoded.
    Payload,
    /// Cloud returned fewer records than requested.
    Count,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Data => "data",
            Field::Quality => "quality",
            Field::Location => "location",
            Field::Crc32Decimal => "crc32_decimal",
            Field::Crc32Hex => "crc32_hex",
            Field::Kind => "kind",
            Field::Payload => "payload",
            Field::Count => "count",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First disagreement found in a pairwise pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Zero-based position in emission order.
    pub index: usize,
    pub field: Field,
    pub console: String,
    pub cloud: String,
    /// Full record dumps for diagnosis.
    pub console_dump: String,
    pub cloud_dump: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record {}: {} mismatch console='{}' cloud='{}'",
            self.index, self.field, self.console, self.cloud
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    FieldMismatch,
    FetchError,
}

/// One fetch+compare cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconciliationAttempt {
    /// 1-based.
    pub ordinal: u32,
    pub outcome: AttemptOutcome,
    /// Log text for a failed attempt. Fetch errors are carried as opaque text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Verified,
    /// Every attempt failed.
    Exhausted,
    /// The delay between attempts was cancelled.
    Cancelled,
}

/// Result of one `reconcile` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub stream: StreamId,
    pub strategy: &'static str,
    pub verdict: Verdict,
    pub attempts: Vec<ReconciliationAttempt>,
    /// Detail of the last failed attempt, if any attempt failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ReconcileReport {
    pub fn is_verified(&self) -> bool {
        self.verdict == Verdict::Verified
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_display_names_record_and_field() {
        let m = Mismatch {
            index: 2,
            field: Field::Quality,
            console: "OK".to_string(),
            cloud: "BAD".to_string(),
            console_dump: String::new(),
            cloud_dump: String::new(),
        };
        assert_eq!(
            m.to_string(),
            "record 2: quality mismatch console='OK' cloud='BAD'"
        );
    }
}
