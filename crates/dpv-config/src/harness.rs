//! Typed view of the merged configuration.
//!
//! Every section and key is optional; absent keys take the defaults below.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use dpv_schemas::{RecordKind, StreamId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub cloud: CloudSection,
    pub device: DeviceSection,
    pub stream: StreamSection,
    pub reconcile: ReconcileSection,
    pub console: ConsoleSection,
    pub monitor: MonitorSection,
    pub scenario: ScenarioSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSection {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub credentials_env: CredentialsEnv,
}

impl Default for CloudSection {
    fn default() -> Self {
        Self {
            base_url: "https://devicecloud.digi.com".to_string(),
            request_timeout_secs: 30,
            credentials_env: CredentialsEnv::default(),
        }
    }
}

/// Names of the environment variables holding the cloud login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsEnv {
    pub username: String,
    pub password: String,
}

impl Default for CredentialsEnv {
    fn default() -> Self {
        Self {
            username: "DPV_CLOUD_USERNAME".to_string(),
            password: "DPV_CLOUD_PASSWORD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    pub device_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    pub name: String,
    pub kind: RecordKind,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            name: "incremental".to_string(),
            kind: RecordKind::Scalar,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSection {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub backoff: BackoffKind,
    /// Cap for exponential backoff.
    pub max_delay_ms: u64,
    /// `full` or `all_but_last`.
    pub comparison_range: String,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 1_000,
            backoff: BackoffKind::Fixed,
            max_delay_ms: 8_000,
            comparison_range: "full".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSection {
    pub marker: String,
    pub batch_timeout_secs: u64,
    pub thread_timeout_secs: u64,
}

impl Default for ConsoleSection {
    fn default() -> Self {
        Self {
            marker: "[DataPoint]".to_string(),
            batch_timeout_secs: 60,
            thread_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    pub poll_interval_ms: u64,
    pub connect_timeout_secs: u64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            connect_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSection {
    pub batches: u32,
    pub settle_ms: u64,
    pub wait_thread_finished: bool,
    pub trigger: Option<TriggerSection>,
}

impl Default for ScenarioSection {
    fn default() -> Self {
        Self {
            batches: 1,
            settle_ms: 0,
            wait_thread_finished: false,
            trigger: None,
        }
    }
}

/// Device request sent before reading the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSection {
    pub target: String,
    #[serde(default)]
    pub payload: String,
    #[serde(default = "default_expected_reply")]
    pub expected_reply: String,
}

fn default_expected_reply() -> String {
    "Launch successful".to_string()
}

impl HarnessConfig {
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let cfg: HarnessConfig = serde_json::from_value(config_json.clone())
            .context("config does not match harness schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reconcile.max_attempts == 0 {
            bail!("reconcile.max_attempts must be at least 1");
        }
        if !matches!(
            self.reconcile.comparison_range.as_str(),
            "full" | "all_but_last"
        ) {
            bail!(
                "reconcile.comparison_range must be 'full' or 'all_but_last', got '{}'",
                self.reconcile.comparison_range
            );
        }
        if self.console.marker.trim().is_empty() {
            bail!("console.marker must not be empty");
        }
        if self.stream.name.trim().is_empty() {
            bail!("stream.name must not be empty");
        }
        Ok(())
    }

    /// Stream under test. Fails when no device id is configured.
    pub fn stream_id(&self) -> Result<StreamId> {
        if self.device.device_id.trim().is_empty() {
            bail!("device.device_id is not configured");
        }
        Ok(StreamId::new(
            self.device.device_id.trim(),
            self.stream.name.trim(),
        ))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.cloud.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile.retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile.max_delay_ms)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.console.batch_timeout_secs)
    }

    pub fn thread_timeout(&self) -> Duration {
        Duration::from_secs(self.console.thread_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.monitor.connect_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.scenario.settle_ms)
    }
}
