//! Command handler modules for dpv-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod cloud;
pub mod console;
pub mod run;

use std::fs::File;
use std::io::{self, Read};

use anyhow::{Context, Result};
use dpv_cloud::{Credentials, DeviceCloudClient};
use dpv_config::{
    report_unused_keys, resolve_cloud_credentials, ConfigCommand, HarnessConfig, LoadedConfig,
    UnusedKeyPolicy,
};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Merge the given layers. No layers means all defaults.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    if path_refs.is_empty() {
        return dpv_config::load_layered_yaml_from_strings(&[]);
    }
    dpv_config::load_layered_yaml(&path_refs)
}

/// Load, report keys `command` does not read, and build the typed view.
pub fn load_harness(
    paths: &[String],
    command: ConfigCommand,
    strict: bool,
) -> Result<(LoadedConfig, HarnessConfig)> {
    let loaded = load_config(paths)?;
    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };

    let report = report_unused_keys(command, &loaded.config_json, policy)?;
    if !report.is_clean() {
        eprintln!(
            "WARN: CONFIG_UNUSED_KEYS command={} unused_leaf_keys={}",
            report.command,
            report.unused_leaf_pointers.len()
        );
        for p in report.unused_leaf_pointers.iter().take(50) {
            eprintln!("  unused={}", p);
        }
        let extra = report.unused_leaf_pointers.len().saturating_sub(50);
        if extra > 0 {
            eprintln!("  ... and {} more", extra);
        }
    }

    let harness = loaded.harness()?;
    Ok((loaded, harness))
}

/// Cloud session with credentials resolved from the environment.
pub fn cloud_client(cfg: &HarnessConfig) -> Result<DeviceCloudClient> {
    let (username, password) = resolve_cloud_credentials(&cfg.cloud.credentials_env).require()?;
    let client = DeviceCloudClient::new(
        cfg.cloud.base_url.clone(),
        Some(Credentials { username, password }),
        cfg.request_timeout(),
    )?;
    Ok(client)
}

/// Console source: a file path, or `-` for stdin.
pub fn open_input(path: &str) -> Result<Box<dyn Read + Send>> {
    if path == "-" {
        return Ok(Box::new(io::stdin()));
    }
    let file = File::open(path).with_context(|| format!("open console input failed: {}", path))?;
    Ok(Box::new(file))
}

/// Whole console capture as text. Invalid UTF-8 is replaced, not rejected.
pub fn read_input(path: &str) -> Result<String> {
    let mut bytes = Vec::new();
    open_input(path)?
        .read_to_end(&mut bytes)
        .with_context(|| format!("read console input failed: {}", path))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    Ok(String::from_utf8_lossy(bytes).into_owned())
}
