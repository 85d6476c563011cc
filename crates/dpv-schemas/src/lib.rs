//! dpv-schemas
//!
//! Record shapes shared by the console parser, the cloud client and the
//! reconciliation engine.
//!
//! A console record is either scalar (textual payload) or binary (the device
//! announces CRC-32 renderings of the payload instead of the payload itself).
//! The two shapes are separate variants so every consumer has to say what it
//! does with each of them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Console side
// ---------------------------------------------------------------------------

/// Record announced by the device with a textual `Data` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub location: String,
    pub quality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub data: String,
}

/// Record announced by the device for a binary stream.
///
/// The console carries the checksum of the uploaded bytes in two renderings:
/// unsigned decimal and 8-digit uppercase hexadecimal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryRecord {
    pub location: String,
    pub quality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub crc32_decimal: String,
    pub crc32_hex: String,
}

/// One observation announced on the device console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsoleRecord {
    Scalar(ScalarRecord),
    Binary(BinaryRecord),
}

impl ConsoleRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            ConsoleRecord::Scalar(_) => RecordKind::Scalar,
            ConsoleRecord::Binary(_) => RecordKind::Binary,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            ConsoleRecord::Scalar(r) => &r.location,
            ConsoleRecord::Binary(r) => &r.location,
        }
    }

    pub fn quality(&self) -> &str {
        match self {
            ConsoleRecord::Scalar(r) => &r.quality,
            ConsoleRecord::Binary(r) => &r.quality,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            ConsoleRecord::Scalar(r) => r.description.as_deref(),
            ConsoleRecord::Binary(r) => r.description.as_deref(),
        }
    }
}

/// Which of the two console record shapes a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Scalar,
    Binary,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Scalar => "scalar",
            RecordKind::Binary => "binary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scalar" => Some(RecordKind::Scalar),
            "binary" => Some(RecordKind::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Cloud side
// ---------------------------------------------------------------------------

/// A record as stored by the cloud service.
///
/// For binary streams `data` is the base64 encoding of the uploaded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudRecord {
    pub location: String,
    pub quality: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CloudRecord {
    pub fn new(
        location: impl Into<String>,
        quality: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            quality: quality.into(),
            data: data.into(),
            description: None,
            timestamp: None,
        }
    }
}

/// Named stream of records for one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId {
    pub device_id: String,
    pub stream: String,
}

impl StreamId {
    pub fn new(device_id: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            stream: stream.into(),
        }
    }

    /// `device_id/stream`, the path suffix used by the cloud REST resources.
    pub fn path(&self) -> String {
        format!("{}/{}", self.device_id, self.stream)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.stream)
    }
}

/// Time ordering requested from the cloud fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOrder {
    Ascending,
    Descending,
}

impl FetchOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOrder::Ascending => "ascending",
            FetchOrder::Descending => "descending",
        }
    }
}
