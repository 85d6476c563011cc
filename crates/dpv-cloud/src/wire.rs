//! Wire-level documents returned by the cloud REST API and their
//! normalization into [`CloudRecord`].
//!
//! Decoding is lenient: unknown fields are ignored and scalar fields may come
//! as JSON strings or numbers depending on the service version.

use chrono::{DateTime, Utc};
use dpv_schemas::CloudRecord;
use serde::Deserialize;
use serde_json::Value;

use crate::CloudError;

/// One page of `/ws/DataPoint/{device}/{stream}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDataPointPage {
    #[serde(default)]
    pub items: Vec<RawDataPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDataPoint {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub quality: Option<Value>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// One page of `/ws/DeviceCore`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDeviceCorePage {
    #[serde(default)]
    pub items: Vec<RawDeviceCore>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeviceCore {
    #[serde(default)]
    pub dev_connectware_id: Option<String>,
    #[serde(default)]
    pub dp_connection_status: Option<Value>,
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn parse_timestamp(v: &Value) -> Result<Option<DateTime<Utc>>, CloudError> {
    let millis = match v {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let millis =
        millis.ok_or_else(|| CloudError::Decode(format!("unrecognised timestamp {v}")))?;
    DateTime::from_timestamp_millis(millis)
        .map(Some)
        .ok_or_else(|| CloudError::Decode(format!("timestamp out of range: {millis}")))
}

/// Normalize one raw data point. A point without `data` is a decode error;
/// missing `quality`/`location` become empty strings so they can still be
/// compared (and reported) field by field.
pub fn normalize_data_point(raw: RawDataPoint) -> Result<CloudRecord, CloudError> {
    let data = raw
        .data
        .as_ref()
        .and_then(value_text)
        .ok_or_else(|| CloudError::Decode("data point without data".to_string()))?;

    let timestamp = match raw.timestamp.as_ref() {
        Some(v) => parse_timestamp(v)?,
        None => None,
    };

    Ok(CloudRecord {
        location: raw.location.as_ref().and_then(value_text).unwrap_or_default(),
        quality: raw.quality.as_ref().and_then(value_text).unwrap_or_default(),
        data,
        description: raw.description.filter(|d| !d.is_empty()),
        timestamp,
    })
}

/// Normalize a page, keeping the service's order.
pub fn normalize_page(page: RawDataPointPage) -> Result<Vec<CloudRecord>, CloudError> {
    page.items.into_iter().map(normalize_data_point).collect()
}

/// `true` when the device core entry for `device_id` reports a live connection.
pub fn connection_status(page: &RawDeviceCorePage, device_id: &str) -> Result<bool, CloudError> {
    let by_id = page.items.iter().find(|d| {
        d.dev_connectware_id
            .as_deref()
            .is_some_and(|id| id.eq_ignore_ascii_case(device_id))
    });
    // A query by id normally yields one entry; accept it even when the id field is omitted.
    let entry = by_id
        .or_else(|| match page.items.as_slice() {
            [only] if only.dev_connectware_id.is_none() => Some(only),
            _ => None,
        })
        .ok_or_else(|| CloudError::NotFound(format!("device {device_id}")))?;

    let status = entry
        .dp_connection_status
        .as_ref()
        .and_then(value_text)
        .ok_or_else(|| CloudError::Decode("device core without dpConnectionStatus".to_string()))?;

    Ok(status.trim() == "1")
}
