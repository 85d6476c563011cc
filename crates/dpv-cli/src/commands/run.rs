//! `dpv run`: one scenario against a live console.
//!
//! The console is read on its own thread from the moment the command starts,
//! so nothing the device prints while the trigger is in flight is lost.

use std::sync::Arc;

use anyhow::{Context, Result};
use dpv_config::ConfigCommand;
use dpv_console::ConsoleStream;
use dpv_monitor::ConnectionMonitor;
use dpv_reconcile::Reconciler;
use dpv_runtime::{comparison_range, retry_policy, Scenario, ScenarioConfig};
use tracing::info;

use super::{cloud_client, load_harness, open_input};

pub fn run_scenario(
    config_paths: &[String],
    console_path: &str,
    wait_connected: bool,
    json: bool,
    strict: bool,
) -> Result<()> {
    let (loaded, cfg) = load_harness(config_paths, ConfigCommand::Run, strict)?;
    let scenario_cfg = ScenarioConfig::from_harness(&cfg)?;
    let client = cloud_client(&cfg)?;

    // Polls for the whole run. Dropping the last handle stops it on early
    // returns; the normal path stops it explicitly once the run is over.
    let monitor = if wait_connected {
        let monitor = ConnectionMonitor::start_shared(
            client.clone(),
            scenario_cfg.stream.device_id.clone(),
            cfg.poll_interval(),
        )?;
        monitor
            .wait_for_connect(cfg.connect_timeout())
            .context("device is not connected to the cloud")?;
        info!(device_id = %monitor.device_id(), "device connected");
        Some(monitor)
    } else {
        None
    };

    let mut console = ConsoleStream::spawn(open_input(console_path)?)?;
    let mut reconciler = Reconciler::new(client)
        .with_policy(retry_policy(&cfg))
        .with_range(comparison_range(&cfg)?);

    let mut scenario = Scenario::new(scenario_cfg);
    if let Some(m) = &monitor {
        scenario = scenario.with_monitor(Arc::clone(m));
    }
    let outcome = scenario.run(&mut console, &mut reconciler);
    if let Some(m) = &monitor {
        m.stop();
    }
    let report = outcome?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("report serialize failed")?
        );
        return Ok(());
    }

    println!("scenario_id={}", report.scenario_id);
    println!("stream={}", report.stream);
    println!("config_hash={}", loaded.config_hash);
    println!("batches_verified={}", report.batches.len());
    if let Some(c) = &report.connection {
        println!("connection_state={}", c.state);
        println!("connection_transitions={}", c.transitions.len());
    }
    println!("started_at_utc={}", report.started_at.to_rfc3339());
    println!("finished_at_utc={}", report.finished_at.to_rfc3339());
    println!("passed=true");
    Ok(())
}
