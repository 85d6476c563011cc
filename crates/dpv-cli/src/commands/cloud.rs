//! Commands that talk to the cloud: verify, fetch, delete-stream, watch.

use std::time::Duration;

use anyhow::{Context, Result};
use dpv_cloud::{RecordFetcher, StreamAdmin};
use dpv_config::ConfigCommand;
use dpv_console::RecordParser;
use dpv_monitor::ConnectionMonitor;
use dpv_reconcile::Reconciler;
use dpv_runtime::{comparison_range, retry_policy};
use dpv_schemas::{FetchOrder, RecordKind};

use super::{cloud_client, load_harness, read_input};

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

pub fn verify(input: &str, config_paths: &[String], strict: bool) -> Result<()> {
    let (loaded, cfg) = load_harness(config_paths, ConfigCommand::Verify, strict)?;
    let stream = cfg.stream_id()?;

    let text = read_input(input)?;
    let records = RecordParser::new(cfg.console.marker.clone())
        .collect(&text)
        .with_context(|| format!("console input {} has a malformed record", input))?;

    let mut reconciler = Reconciler::new(cloud_client(&cfg)?)
        .with_policy(retry_policy(&cfg))
        .with_range(comparison_range(&cfg)?);
    let report = match cfg.stream.kind {
        RecordKind::Scalar => reconciler.reconcile(&stream, &records),
        RecordKind::Binary => reconciler.reconcile_binary(&stream, &records),
    };

    println!("stream={}", stream);
    println!("config_hash={}", loaded.config_hash);
    println!("records={}", records.len());
    println!("strategy={}", report.strategy);
    println!("attempts={}", report.attempt_count());
    if !report.is_verified() {
        anyhow::bail!(
            "VERIFICATION_FAILED stream={} attempts={}: {}",
            stream,
            report.attempt_count(),
            report.diagnostic.as_deref().unwrap_or("no diagnostic")
        );
    }
    println!("verified=true");
    Ok(())
}

// ---------------------------------------------------------------------------
// fetch
// ---------------------------------------------------------------------------

pub fn fetch(config_paths: &[String], count: usize, ascending: bool, strict: bool) -> Result<()> {
    let (_, cfg) = load_harness(config_paths, ConfigCommand::Fetch, strict)?;
    let stream = cfg.stream_id()?;
    let order = if ascending {
        FetchOrder::Ascending
    } else {
        FetchOrder::Descending
    };

    let mut client = cloud_client(&cfg)?;
    let records = client.fetch(&stream, count, order)?;

    println!("stream={}", stream);
    println!("order={}", order.as_str());
    println!("records={}", records.len());
    for (i, r) in records.iter().enumerate() {
        let ts = r
            .timestamp
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        println!(
            "record={} location={} quality={} data={} timestamp={}",
            i, r.location, r.quality, r.data, ts
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// delete-stream
// ---------------------------------------------------------------------------

pub fn delete_stream(config_paths: &[String], yes: bool, strict: bool) -> Result<()> {
    let (_, cfg) = load_harness(config_paths, ConfigCommand::DeleteStream, strict)?;
    let stream = cfg.stream_id()?;
    if !yes {
        anyhow::bail!(
            "REFUSING DELETE: stream {} and all its records would be removed. Re-run with: `dpv delete-stream --yes`",
            stream
        );
    }

    cloud_client(&cfg)?.delete_stream(&stream)?;
    println!("deleted=true stream={}", stream);
    Ok(())
}

// ---------------------------------------------------------------------------
// watch
// ---------------------------------------------------------------------------

pub fn watch(
    config_paths: &[String],
    expect: &str,
    timeout_secs: Option<u64>,
    strict: bool,
) -> Result<()> {
    let (_, cfg) = load_harness(config_paths, ConfigCommand::Watch, strict)?;
    let device_id = cfg.stream_id()?.device_id;
    let timeout = timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| cfg.connect_timeout());

    let monitor = ConnectionMonitor::start(cloud_client(&cfg)?, device_id, cfg.poll_interval())?;
    let outcome = match expect.trim().to_ascii_lowercase().as_str() {
        "connected" => monitor.wait_for_connect(timeout),
        "disconnected" => monitor.wait_for_disconnect(timeout),
        other => anyhow::bail!(
            "invalid --expect '{}'. expected one of: connected | disconnected",
            other
        ),
    };
    monitor.stop();

    println!("device_id={}", monitor.device_id());
    println!("state={}", monitor.state());
    println!("transitions={}", monitor.transitions().len());
    outcome?;
    Ok(())
}
