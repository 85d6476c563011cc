use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dpv_cloud::{CloudError, DeviceRequester, RecordFetcher, StreamAdmin};
use dpv_console::{read_batch, wait_thread_finished, ConsoleError, ConsoleStream, RecordParser};
use dpv_monitor::{ConnectionState, SharedMonitor, Transition};
use dpv_reconcile::{Delay, ReconcileReport, Reconciler, Verdict, WaitOutcome};
use dpv_schemas::{RecordKind, StreamId};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Device request that starts the upload under test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionTrigger {
    pub target: String,
    pub payload: String,
    /// Reply text the device must answer with, compared after trimming.
    pub expected_reply: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioConfig {
    pub stream: StreamId,
    pub kind: RecordKind,
    pub marker: String,
    pub batches: u32,
    pub batch_timeout: Duration,
    pub thread_timeout: Duration,
    /// Wait between reading a batch and fetching it from the cloud.
    pub settle: Duration,
    pub wait_thread_finished: bool,
    pub trigger: Option<ActionTrigger>,
}

impl ScenarioConfig {
    /// One batch, default console marker and wait windows, no trigger.
    pub fn new(stream: StreamId, kind: RecordKind) -> Self {
        Self {
            stream,
            kind,
            marker: dpv_console::DATAPOINT_MARKER.to_string(),
            batches: 1,
            batch_timeout: dpv_console::DEFAULT_WAIT,
            thread_timeout: dpv_console::DEFAULT_WAIT,
            settle: Duration::ZERO,
            wait_thread_finished: false,
            trigger: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    pub scenario_id: Uuid,
    pub stream: StreamId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub batches: Vec<ReconcileReport>,
    /// Present when the scenario ran under a connection monitor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionSummary>,
}

/// What the connection monitor saw while the scenario ran.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionSummary {
    /// State when the scenario finished.
    pub state: ConnectionState,
    /// Transitions observed after the scenario started.
    pub transitions: Vec<Transition>,
}

impl ConnectionSummary {
    fn since(monitor: &SharedMonitor, started_at: DateTime<Utc>) -> Self {
        Self {
            state: monitor.state(),
            transitions: monitor
                .transitions()
                .into_iter()
                .filter(|t| t.at >= started_at)
                .collect(),
        }
    }

    pub fn saw_disconnect(&self) -> bool {
        self.state == ConnectionState::Disconnected
            || self
                .transitions
                .iter()
                .any(|t| t.to == ConnectionState::Disconnected)
    }
}

/// Where in the scenario a console read failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// 1-based batch number.
    Batch(u32),
    ThreadFinished,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Batch(n) => write!(f, "batch {n}"),
            Stage::ThreadFinished => write!(f, "thread completion"),
        }
    }
}

#[derive(Debug)]
pub enum ScenarioError {
    /// The device request could not be delivered.
    Trigger(CloudError),
    /// The device answered the request with something else.
    UnexpectedReply { expected: String, got: String },
    /// Console read timed out, closed, or carried a malformed record.
    Console { stage: Stage, source: ConsoleError },
    /// Reconciliation did not verify the batch.
    Verification { batch: u32, report: Box<ReconcileReport> },
    /// The settle wait was cancelled.
    Cancelled { batch: u32 },
    /// The scenario was handed a monitor that is no longer polling.
    MonitorStopped,
}

impl ScenarioError {
    pub fn is_read_timeout(&self) -> bool {
        matches!(self, ScenarioError::Console { source, .. } if source.is_timeout())
    }
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Trigger(e) => write!(f, "device request failed: {e}"),
            ScenarioError::UnexpectedReply { expected, got } => {
                write!(f, "device replied '{got}', expected '{expected}'")
            }
            ScenarioError::Console { stage, source } => write!(f, "{stage}: {source}"),
            ScenarioError::Verification { batch, report } => write!(
                f,
                "batch {batch}: verification {} after {} attempt(s): {}",
                match report.verdict {
                    Verdict::Cancelled => "cancelled",
                    _ => "failed",
                },
                report.attempts.len(),
                report.diagnostic.as_deref().unwrap_or("no diagnostic")
            ),
            ScenarioError::Cancelled { batch } => {
                write!(f, "batch {batch}: settle wait cancelled")
            }
            ScenarioError::MonitorStopped => write!(f, "connection monitor is not running"),
        }
    }
}

impl std::error::Error for ScenarioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScenarioError::Trigger(e) => Some(e),
            ScenarioError::Console { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One scenario run. The reconciler's cloud session also sends the trigger
/// and deletes the stream on failure.
///
/// An attached monitor must be polling when the run starts. The scenario
/// never stops it; the caller does, after the last scenario.
pub struct Scenario {
    cfg: ScenarioConfig,
    parser: RecordParser,
    monitor: Option<SharedMonitor>,
}

impl Scenario {
    pub fn new(cfg: ScenarioConfig) -> Self {
        let parser = RecordParser::new(cfg.marker.clone());
        Self {
            cfg,
            parser,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: SharedMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.cfg
    }

    pub fn run<F, D>(
        &self,
        console: &mut ConsoleStream,
        reconciler: &mut Reconciler<F, D>,
    ) -> Result<ScenarioReport, ScenarioError>
    where
        F: RecordFetcher + StreamAdmin + DeviceRequester,
        D: Delay,
    {
        let scenario_id = Uuid::new_v4();
        let started_at = Utc::now();
        let stream = &self.cfg.stream;
        info!(
            %scenario_id,
            %stream,
            kind = %self.cfg.kind,
            batches = self.cfg.batches,
            "scenario started"
        );

        let outcome = self.drive(console, reconciler);
        let connection = self
            .monitor
            .as_ref()
            .map(|m| ConnectionSummary::since(m, started_at));
        if let Some(c) = connection.as_ref().filter(|c| c.saw_disconnect()) {
            warn!(
                %scenario_id,
                %stream,
                state = %c.state,
                transitions = c.transitions.len(),
                "device disconnected during scenario"
            );
        }

        match outcome {
            Ok(batches) => {
                info!(%scenario_id, %stream, batches = batches.len(), "scenario passed");
                Ok(ScenarioReport {
                    scenario_id,
                    stream: stream.clone(),
                    started_at,
                    finished_at: Utc::now(),
                    batches,
                    connection,
                })
            }
            Err(e) => {
                error!(%scenario_id, %stream, error = %e, "scenario failed");
                self.cleanup(reconciler.fetcher_mut());
                Err(e)
            }
        }
    }

    fn drive<F, D>(
        &self,
        console: &mut ConsoleStream,
        reconciler: &mut Reconciler<F, D>,
    ) -> Result<Vec<ReconcileReport>, ScenarioError>
    where
        F: RecordFetcher + StreamAdmin + DeviceRequester,
        D: Delay,
    {
        if self.monitor.as_ref().is_some_and(|m| !m.is_running()) {
            return Err(ScenarioError::MonitorStopped);
        }
        if let Some(trigger) = &self.cfg.trigger {
            self.fire(trigger, reconciler.fetcher_mut())?;
        }

        let mut reports = Vec::new();
        for batch in 1..=self.cfg.batches {
            let records = read_batch(console, &self.parser, self.cfg.batch_timeout).map_err(
                |source| ScenarioError::Console {
                    stage: Stage::Batch(batch),
                    source,
                },
            )?;

            if !self.cfg.settle.is_zero()
                && reconciler.delay_mut().wait(self.cfg.settle) == WaitOutcome::Cancelled
            {
                return Err(ScenarioError::Cancelled { batch });
            }

            let report = match self.cfg.kind {
                RecordKind::Scalar => reconciler.reconcile(&self.cfg.stream, &records),
                RecordKind::Binary => reconciler.reconcile_binary(&self.cfg.stream, &records),
            };
            if !report.is_verified() {
                return Err(ScenarioError::Verification {
                    batch,
                    report: Box::new(report),
                });
            }
            reports.push(report);
        }

        if self.cfg.wait_thread_finished {
            wait_thread_finished(console, self.cfg.thread_timeout).map_err(|source| {
                ScenarioError::Console {
                    stage: Stage::ThreadFinished,
                    source,
                }
            })?;
        }
        Ok(reports)
    }

    fn fire<S: DeviceRequester>(
        &self,
        trigger: &ActionTrigger,
        session: &mut S,
    ) -> Result<(), ScenarioError> {
        let reply = session
            .send_device_request(&self.cfg.stream.device_id, &trigger.target, &trigger.payload)
            .map_err(ScenarioError::Trigger)?;
        if reply.trim() != trigger.expected_reply.trim() {
            return Err(ScenarioError::UnexpectedReply {
                expected: trigger.expected_reply.clone(),
                got: reply,
            });
        }
        info!(target_name = %trigger.target, "device request accepted");
        Ok(())
    }

    fn cleanup<S: StreamAdmin>(&self, session: &mut S) {
        let stream = &self.cfg.stream;
        match session.delete_stream(stream) {
            Ok(()) => info!(%stream, "stream deleted after failed scenario"),
            Err(e) => warn!(%stream, error = %e, "stream cleanup failed"),
        }
    }
}
