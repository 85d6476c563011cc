//! dpv-config
//!
//! Layered YAML configuration for the verification harness.
//!
//! - Layers merge in order; later layers override earlier ones key by key.
//! - The merged document is hashed over its canonical JSON so two runs can be
//!   compared by `config_hash` alone.
//! - Literal credentials are rejected. The YAML names environment variables;
//!   values are resolved at startup by [`resolve_cloud_credentials`].
//! - Keys no command reads are reported (warn) or rejected (fail).

mod consumption;
mod harness;
mod secrets;

pub use consumption::{
    consumed_pointers_for, report_unused_keys, ConfigCommand, UnusedKeyPolicy, UnusedKeyReport,
};
pub use harness::{
    BackoffKind, CloudSection, ConsoleSection, CredentialsEnv, DeviceSection, HarnessConfig,
    MonitorSection, ReconcileSection, ScenarioSection, StreamSection, TriggerSection,
};
pub use secrets::{resolve_cloud_credentials, ResolvedCredentials};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Leaf string values starting with any of these abort loading.
const SECRET_PREFIXES: &[&str] = &[
    "-----BEGIN", // PEM private keys
    "AKIA",       // AWS access key id
    "Basic ",     // pasted Authorization header
    "Bearer ",
    "ghp_",
    "glpat-",
    "sk-",
    "xoxb-",
];

/// Leaf keys that must hold an environment variable name, never a value.
const CREDENTIAL_KEYS: &[&str] = &["password", "passwd", "secret", "token", "api_key"];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view with defaults for absent keys.
    pub fn harness(&self) -> Result<HarnessConfig> {
        HarnessConfig::from_config_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}")))
        .collect::<Result<Vec<String>>>()?;
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for (i, raw) in yaml_docs.iter().enumerate() {
        let layer: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        let layer = match layer {
            // An empty file is an empty layer.
            serde_yaml::Value::Null => serde_json::json!({}),
            other => serde_json::to_value(other).context("yaml->json conversion failed")?,
        };
        merged = deep_merge(merged, layer);
    }

    enforce_no_secret_literals(&merged)?;

    // serde_json's default map is ordered by key, so this is canonical.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(base: Value, over: Value) -> Value {
    match (base, over) {
        (Value::Object(mut base_map), Value::Object(over_map)) => {
            for (k, v) in over_map {
                let prev = base_map.remove(&k).unwrap_or(Value::Null);
                base_map.insert(k, deep_merge(prev, v));
            }
            Value::Object(base_map)
        }
        (_, other) => other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    consumption::collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        let Some(s) = v.pointer(&ptr).and_then(Value::as_str) else {
            continue;
        };
        let key = ptr.rsplit('/').next().unwrap_or_default();
        if looks_like_secret(s) || (is_credential_key(key) && !looks_like_env_name(s)) {
            bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn is_credential_key(key: &str) -> bool {
    CREDENTIAL_KEYS.contains(&key.to_ascii_lowercase().as_str())
}

/// `UPPER_SNAKE` names are what the credential keys are expected to hold.
fn looks_like_env_name(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty()
        && t.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !t.starts_with(|c: char| c.is_ascii_digit())
}
