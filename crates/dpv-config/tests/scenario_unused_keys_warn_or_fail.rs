//! Unused-key guard.
//!
//! Validates:
//! 1) unused keys are reported under Warn without error
//! 2) unused keys fail under Fail
//! 3) keys under a consumed prefix are not flagged
//! 4) unused pointers come back sorted

use dpv_config::{load_layered_yaml_from_strings, report_unused_keys, ConfigCommand, UnusedKeyPolicy};

#[test]
fn warn_policy_reports_without_error() {
    let yaml = r#"
cloud:
  base_url: "https://cloud.example.test"
stream:
  name: incremental
legacy:
  telnet_port: 23
  ftp_root: /tmp
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report =
        report_unused_keys(ConfigCommand::Fetch, &loaded.config_json, UnusedKeyPolicy::Warn)
            .expect("warn policy must not error");

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/legacy/ftp_root".to_string(), "/legacy/telnet_port".to_string()]
    );
    assert_eq!(report.command, "fetch");
}

#[test]
fn fail_policy_errors_on_unused_keys() {
    let yaml = "monitor:\n  poll_interval_ms: 500\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();

    let err = report_unused_keys(ConfigCommand::Parse, &loaded.config_json, UnusedKeyPolicy::Fail)
        .unwrap_err();
    let msg = format!("{err:?}");
    assert!(msg.contains("CONFIG_UNUSED_KEYS"));
    assert!(msg.contains("/monitor/poll_interval_ms"));
}

#[test]
fn run_consumes_every_harness_section() {
    let yaml = r#"
cloud:
  credentials_env:
    username: DPV_CLOUD_USERNAME
device:
  device_id: dev-1
stream:
  kind: binary
reconcile:
  backoff: exponential
console:
  batch_timeout_secs: 90
monitor:
  poll_interval_ms: 250
scenario:
  batches: 50
  trigger:
    target: test_datapoint_send_datastream_with_datapoints
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report =
        report_unused_keys(ConfigCommand::Run, &loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}

#[test]
fn fetch_does_not_consume_reconcile_settings() {
    let yaml = "stream:\n  name: s\n  kind: scalar\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report =
        report_unused_keys(ConfigCommand::Fetch, &loaded.config_json, UnusedKeyPolicy::Warn)
            .unwrap();
    assert_eq!(report.unused_leaf_pointers, vec!["/stream/kind".to_string()]);
}
