//! Full scenarios against an in-memory cloud and console.
//!
//! Invariants under test:
//! - trigger, batches and thread completion run in order and pass
//! - every failure path deletes the stream under test
//! - a failed delete never replaces the original error
//! - the settle delay runs once per batch through the injected delay

use std::time::Duration;

use dpv_cloud::CloudError;
use dpv_console::ConsoleStream;
use dpv_reconcile::{Reconciler, Verdict};
use dpv_runtime::{ActionTrigger, Scenario, ScenarioConfig, ScenarioError, Stage};
use dpv_schemas::{CloudRecord, RecordKind, StreamId};
use dpv_testkit::{batch_text, binary_line, console_pipe, scalar_line, FakeCloud, RecordingDelay};

const DEVICE: &str = "00000000-00000000-00409DFF-FF000001";

fn stream() -> StreamId {
    StreamId::new(DEVICE, "incremental")
}

fn batch(values: &[&str]) -> String {
    let lines: Vec<String> = values.iter().map(|v| scalar_line("/a", "OK", v)).collect();
    batch_text(&lines)
}

fn uploads(values: &[&str]) -> Vec<CloudRecord> {
    values.iter().map(|v| CloudRecord::new("/a", "OK", *v)).collect()
}

fn trigger() -> ActionTrigger {
    ActionTrigger {
        target: "test_datapoint_send_datastream_with_datapoints".to_string(),
        payload: "2;3;Integer;".to_string(),
        expected_reply: "Launch successful".to_string(),
    }
}

#[test]
fn scenario_trigger_batches_and_thread_completion_pass() {
    let (tx, rx) = console_pipe();
    tx.write(&batch(&["10", "20", "30"]));
    tx.write(&batch(&["10", "20", "30"]));
    tx.line("Finished the Thread for incremental");
    drop(tx);
    let mut console = ConsoleStream::spawn(rx).unwrap();

    let mut cloud = FakeCloud::new();
    cloud.upload(&stream(), uploads(&["10", "20", "30", "10", "20", "30"]));

    let mut cfg = ScenarioConfig::new(stream(), RecordKind::Scalar);
    cfg.batches = 2;
    cfg.settle = Duration::from_millis(500);
    cfg.wait_thread_finished = true;
    cfg.trigger = Some(trigger());

    let mut reconciler = Reconciler::with_delay(&mut cloud, RecordingDelay::new());
    let report = Scenario::new(cfg).run(&mut console, &mut reconciler).unwrap();

    assert_eq!(report.batches.len(), 2);
    assert!(report.batches.iter().all(|b| b.is_verified()));
    assert_eq!(report.stream, stream());
    assert!(report.finished_at >= report.started_at);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["batches"][1]["verdict"], "verified");
    assert_eq!(json["stream"]["device_id"], DEVICE);

    let (_, delay) = reconciler.into_parts();
    assert_eq!(
        delay.waits(),
        &[Duration::from_millis(500), Duration::from_millis(500)]
    );

    assert_eq!(cloud.requests().len(), 1);
    assert_eq!(cloud.requests()[0].device_id, DEVICE);
    assert_eq!(cloud.requests()[0].payload, "2;3;Integer;");
    assert_eq!(cloud.fetches().len(), 2);
    assert!(cloud.deleted().is_empty());
}

#[test]
fn scenario_verification_failure_deletes_stream() {
    let (tx, rx) = console_pipe();
    tx.write(&batch(&["10", "20", "30"]));
    let mut console = ConsoleStream::spawn(rx).unwrap();

    let mut cloud = FakeCloud::new();
    cloud.upload(&stream(), uploads(&["10", "21", "30"]));

    let mut reconciler = Reconciler::with_delay(&mut cloud, RecordingDelay::new());
    let err = Scenario::new(ScenarioConfig::new(stream(), RecordKind::Scalar))
        .run(&mut console, &mut reconciler)
        .unwrap_err();

    match &err {
        ScenarioError::Verification { batch, report } => {
            assert_eq!(*batch, 1);
            assert_eq!(report.verdict, Verdict::Exhausted);
            assert_eq!(report.attempts.len(), 3);
        }
        other => panic!("expected verification failure, got {other}"),
    }
    assert!(err.to_string().contains("record 1: data mismatch"));
    drop(reconciler);

    assert_eq!(cloud.deleted(), &[stream()]);
    drop(tx);
}

#[test]
fn scenario_read_timeout_deletes_stream() {
    let (tx, rx) = console_pipe();
    tx.line(&scalar_line("/a", "OK", "10"));
    let mut console = ConsoleStream::spawn(rx).unwrap();

    let mut cloud = FakeCloud::new();
    cloud.upload(&stream(), uploads(&["10"]));

    let mut cfg = ScenarioConfig::new(stream(), RecordKind::Scalar);
    cfg.batch_timeout = Duration::from_millis(100);

    let mut reconciler = Reconciler::with_delay(&mut cloud, RecordingDelay::new());
    let err = Scenario::new(cfg)
        .run(&mut console, &mut reconciler)
        .unwrap_err();

    assert!(err.is_read_timeout(), "{err}");
    assert!(matches!(
        err,
        ScenarioError::Console {
            stage: Stage::Batch(1),
            ..
        }
    ));
    drop(reconciler);
    assert!(cloud.fetches().is_empty());
    assert_eq!(cloud.deleted(), &[stream()]);
    drop(tx);
}

#[test]
fn scenario_unexpected_reply_stops_before_reading() {
    let (tx, rx) = console_pipe();
    let mut console = ConsoleStream::spawn(rx).unwrap();

    let mut cloud = FakeCloud::new();
    cloud.upload(&stream(), uploads(&["10"]));
    cloud.set_reply(Ok("Launch failed: busy".to_string()));

    let mut cfg = ScenarioConfig::new(stream(), RecordKind::Scalar);
    cfg.trigger = Some(trigger());

    let mut reconciler = Reconciler::with_delay(&mut cloud, RecordingDelay::new());
    let err = Scenario::new(cfg)
        .run(&mut console, &mut reconciler)
        .unwrap_err();

    match err {
        ScenarioError::UnexpectedReply { expected, got } => {
            assert_eq!(expected, "Launch successful");
            assert_eq!(got, "Launch failed: busy");
        }
        other => panic!("expected unexpected reply, got {other}"),
    }
    drop(reconciler);
    assert!(cloud.fetches().is_empty());
    assert_eq!(cloud.deleted().len(), 1);
    drop(tx);
}

#[test]
fn scenario_failed_cleanup_keeps_original_error() {
    let (tx, rx) = console_pipe();
    tx.write(&batch(&["10"]));
    let mut console = ConsoleStream::spawn(rx).unwrap();

    let mut cloud = FakeCloud::new();
    cloud.fail_next_fetches(5, CloudError::Transport("connection refused".to_string()));
    cloud.fail_deletes_with(CloudError::Api {
        status: Some(500),
        body: "delete failed".to_string(),
    });

    let mut reconciler = Reconciler::with_delay(&mut cloud, RecordingDelay::new());
    let err = Scenario::new(ScenarioConfig::new(stream(), RecordKind::Scalar))
        .run(&mut console, &mut reconciler)
        .unwrap_err();

    assert!(matches!(err, ScenarioError::Verification { .. }));
    assert!(err.to_string().contains("connection refused"));
    drop(reconciler);
    assert!(cloud.deleted().is_empty());
    drop(tx);
}

#[test]
fn scenario_binary_stream_passes() {
    let (line, stored) = binary_line("/bin", "0", b"\x01\x02\x03\x04");
    let (tx, rx) = console_pipe();
    tx.write(&batch_text(&[line]));
    let mut console = ConsoleStream::spawn(rx).unwrap();

    let stream = StreamId::new(DEVICE, "binary");
    let mut cloud = FakeCloud::new();
    cloud.upload(&stream, [stored]);

    let mut reconciler = Reconciler::with_delay(&mut cloud, RecordingDelay::new());
    let report = Scenario::new(ScenarioConfig::new(stream.clone(), RecordKind::Binary))
        .run(&mut console, &mut reconciler)
        .unwrap();

    assert_eq!(report.batches.len(), 1);
    assert_eq!(report.batches[0].strategy, "binary_checksum");
    drop(tx);
}

#[test]
fn scenario_reply_and_expectation_compare_trimmed() {
    let (tx, rx) = console_pipe();
    tx.write(&batch(&["10"]));
    let mut console = ConsoleStream::spawn(rx).unwrap();

    let mut cloud = FakeCloud::new();
    cloud.upload(&stream(), uploads(&["10"]));
    cloud.set_reply(Ok("Launch successful\r\n".to_string()));

    let mut cfg = ScenarioConfig::new(stream(), RecordKind::Scalar);
    cfg.trigger = Some(ActionTrigger {
        expected_reply: "  Launch successful \n".to_string(),
        ..trigger()
    });

    let mut reconciler = Reconciler::with_delay(&mut cloud, RecordingDelay::new());
    let report = Scenario::new(cfg)
        .run(&mut console, &mut reconciler)
        .unwrap();
    assert_eq!(report.batches.len(), 1);
    drop(reconciler);
    assert!(cloud.deleted().is_empty());
    drop(tx);
}
