//! dpv-monitor
//!
//! Background connection-status monitor for one device.
//!
//! The monitor polls a [`ConnectionProbe`] on its own thread and records every
//! connect/disconnect transition. It shares nothing with a reconciliation
//! beyond read-only state, and it is released explicitly: `stop()` or drop.
//! Scenarios that reuse one monitor hold it as a [`SharedMonitor`].

use std::fmt;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dpv_cloud::ConnectionProbe;
use serde::Serialize;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Explicit handle for a monitor reused across scenarios.
pub type SharedMonitor = Arc<ConnectionMonitor>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No successful probe yet.
    Unknown,
    Connected,
    Disconnected,
}

impl ConnectionState {
    fn from_connected(connected: bool) -> Self {
        if connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Unknown => "unknown",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub at: DateTime<Utc>,
    pub from: ConnectionState,
    pub to: ConnectionState,
}

#[derive(Debug)]
pub enum MonitorError {
    /// The expected state was not observed in time.
    Timeout {
        expected: ConnectionState,
        observed: ConnectionState,
        waited: Duration,
    },
    /// The monitor was stopped while a caller was waiting.
    Stopped,
    /// The polling thread could not be started.
    Spawn(io::Error),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Timeout {
                expected,
                observed,
                waited,
            } => write!(
                f,
                "device not {expected} after {}ms (last observed: {observed})",
                waited.as_millis()
            ),
            MonitorError::Stopped => write!(f, "connection monitor stopped"),
            MonitorError::Spawn(e) => write!(f, "failed to start monitor thread: {e}"),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct Observed {
    state: ConnectionState,
    transitions: Vec<Transition>,
    running: bool,
}

struct Shared {
    observed: Mutex<Observed>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Observed> {
        self.observed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn poll_loop<P: ConnectionProbe>(
    mut probe: P,
    device_id: String,
    every: Duration,
    shared: Arc<Shared>,
) {
    loop {
        let answer = probe.is_connected(&device_id);

        let mut obs = shared.lock();
        if !obs.running {
            break;
        }
        match answer {
            Ok(connected) => {
                let next = ConnectionState::from_connected(connected);
                if next != obs.state {
                    info!(
                        device_id = %device_id,
                        from = %obs.state,
                        to = %next,
                        "device connection changed"
                    );
                    let from = obs.state;
                    obs.transitions.push(Transition {
                        at: Utc::now(),
                        from,
                        to: next,
                    });
                    obs.state = next;
                    shared.changed.notify_all();
                }
            }
            Err(e) => warn!(device_id = %device_id, error = %e, "connection probe failed"),
        }

        let (obs, _) = shared
            .changed
            .wait_timeout_while(obs, every, |o| o.running)
            .unwrap_or_else(PoisonError::into_inner);
        if !obs.running {
            break;
        }
    }
    debug!(device_id = %device_id, "connection monitor thread exiting");
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct ConnectionMonitor {
    device_id: String,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionMonitor {
    /// Start polling `probe` every `poll_interval`.
    pub fn start<P>(
        probe: P,
        device_id: impl Into<String>,
        poll_interval: Duration,
    ) -> Result<Self, MonitorError>
    where
        P: ConnectionProbe + Send + 'static,
    {
        let device_id = device_id.into();
        let shared = Arc::new(Shared {
            observed: Mutex::new(Observed {
                state: ConnectionState::Unknown,
                transitions: Vec::new(),
                running: true,
            }),
            changed: Condvar::new(),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            let device_id = device_id.clone();
            thread::Builder::new()
                .name("dpv-connection-monitor".to_string())
                .spawn(move || poll_loop(probe, device_id, poll_interval, shared))
                .map_err(MonitorError::Spawn)?
        };
        info!(
            device_id = %device_id,
            poll_ms = poll_interval.as_millis() as u64,
            "connection monitor started"
        );

        Ok(Self {
            device_id,
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Start and wrap in the shared handle.
    pub fn start_shared<P>(
        probe: P,
        device_id: impl Into<String>,
        poll_interval: Duration,
    ) -> Result<SharedMonitor, MonitorError>
    where
        P: ConnectionProbe + Send + 'static,
    {
        Self::start(probe, device_id, poll_interval).map(Arc::new)
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.shared.lock().transitions.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    pub fn wait_for_connect(&self, timeout: Duration) -> Result<(), MonitorError> {
        self.wait_for(ConnectionState::Connected, timeout)
    }

    pub fn wait_for_disconnect(&self, timeout: Duration) -> Result<(), MonitorError> {
        self.wait_for(ConnectionState::Disconnected, timeout)
    }

    fn wait_for(&self, expected: ConnectionState, timeout: Duration) -> Result<(), MonitorError> {
        let obs = self.shared.lock();
        let (obs, _) = self
            .shared
            .changed
            .wait_timeout_while(obs, timeout, |o| o.state != expected && o.running)
            .unwrap_or_else(PoisonError::into_inner);

        if obs.state == expected {
            return Ok(());
        }
        if !obs.running {
            return Err(MonitorError::Stopped);
        }
        Err(MonitorError::Timeout {
            expected,
            observed: obs.state,
            waited: timeout,
        })
    }

    /// Stop polling and join the thread. Later calls do nothing.
    pub fn stop(&self) {
        {
            let mut obs = self.shared.lock();
            if !obs.running {
                return;
            }
            obs.running = false;
            self.shared.changed.notify_all();
        }

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = worker {
            if handle.join().is_err() {
                warn!(device_id = %self.device_id, "connection monitor thread panicked");
            }
        }
        info!(device_id = %self.device_id, "connection monitor stopped");
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
