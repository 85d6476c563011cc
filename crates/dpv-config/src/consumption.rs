//! Which config keys each command reads, and the report of keys nothing reads.
//!
//! Consumed entries are JSON-pointer prefixes: `/cloud` covers
//! `/cloud/base_url` and `/cloud/credentials_env/username`. A leaf not under
//! any consumed prefix is unused.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommand {
    Parse,
    Verify,
    Fetch,
    DeleteStream,
    Watch,
    Run,
}

impl ConfigCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigCommand::Parse => "parse",
            ConfigCommand::Verify => "verify",
            ConfigCommand::Fetch => "fetch",
            ConfigCommand::DeleteStream => "delete-stream",
            ConfigCommand::Watch => "watch",
            ConfigCommand::Run => "run",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub command: String,
    /// Sorted, unique.
    pub consumed_prefixes: Vec<String>,
    /// Sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

const CLOUD_SESSION: &[&str] = &["/cloud", "/device/device_id"];

/// Pointers read by `command`. Only list what the command actually reads.
pub fn consumed_pointers_for(command: ConfigCommand) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    match command {
        ConfigCommand::Parse => out.push("/console/marker"),
        ConfigCommand::Verify => {
            out.extend(CLOUD_SESSION);
            out.extend(["/stream", "/reconcile", "/console/marker"]);
        }
        ConfigCommand::Fetch | ConfigCommand::DeleteStream => {
            out.extend(CLOUD_SESSION);
            out.push("/stream/name");
        }
        ConfigCommand::Watch => {
            out.extend(CLOUD_SESSION);
            out.push("/monitor");
        }
        ConfigCommand::Run => {
            out.extend(CLOUD_SESSION);
            out.extend(["/stream", "/reconcile", "/console", "/monitor", "/scenario"]);
        }
    }
    out
}

/// Warn: always `Ok(report)`. Fail: `Err` when any leaf is unused.
pub fn report_unused_keys(
    command: ConfigCommand,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed_prefixes: Vec<String> = consumed_pointers_for(command)
        .into_iter()
        .map(normalize_pointer)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|leaf| !consumed_prefixes.iter().any(|p| is_prefix_pointer(p, leaf)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        command: command.as_str().to_string(),
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Warn && !report.is_clean() {
        warn!(
            command = %report.command,
            unused = report.unused_leaf_pointers.len(),
            first = ?report.unused_leaf_pointers.first(),
            "config keys not read by this command"
        );
    }

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS (command={}): {} unused config leaf key(s). First few: {:?}",
            report.command,
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers.iter().take(12).collect::<Vec<_>>()
        );
    }
    Ok(report)
}

fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.len() > 1 && s.ends_with('/') {
        s.pop();
    }
    s
}

/// `/a/b` covers `/a/b` and `/a/b/c`, not `/a/bc`. `/` covers everything.
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    prefix == "/"
        || leaf == prefix
        || leaf
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub(crate) fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, child) in map {
                let token = k.replace('~', "~0").replace('/', "~1");
                collect_leaf_pointers(child, &format!("{prefix}/{token}"), out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_leaf_pointers(child, &format!("{prefix}/{i}"), out);
            }
        }
        _ if prefix.is_empty() => out.push("/".to_string()),
        _ => out.push(prefix.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_boundaries() {
        assert!(is_prefix_pointer("/cloud", "/cloud/base_url"));
        assert!(is_prefix_pointer("/cloud", "/cloud"));
        assert!(!is_prefix_pointer("/cloud", "/cloudy"));
        assert!(is_prefix_pointer("/", "/anything"));
    }

    #[test]
    fn pointer_tokens_are_escaped() {
        let mut out = Vec::new();
        collect_leaf_pointers(&serde_json::json!({"a/b": {"c~d": 1}}), "", &mut out);
        assert_eq!(out, vec!["/a~1b/c~0d"]);
    }

    #[test]
    fn every_command_reads_something() {
        for c in [
            ConfigCommand::Parse,
            ConfigCommand::Verify,
            ConfigCommand::Fetch,
            ConfigCommand::DeleteStream,
            ConfigCommand::Watch,
            ConfigCommand::Run,
        ] {
            assert!(!consumed_pointers_for(c).is_empty(), "{}", c.as_str());
        }
    }
}
