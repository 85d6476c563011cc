use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dpv_cloud::{CloudError, ConnectionProbe};

/// Probe that replays a script of answers, then repeats the last one.
///
/// `calls()` is shared with clones so a test can watch a probe that was moved
/// into a monitor thread.
#[derive(Clone)]
pub struct ScriptedProbe {
    script: Arc<Mutex<VecDeque<Result<bool, CloudError>>>>,
    last: Arc<Mutex<Result<bool, CloudError>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn new(script: Vec<Result<bool, CloudError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(Ok(false))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Convenience: a sequence of plain connected/disconnected answers.
    pub fn states(states: &[bool]) -> Self {
        Self::new(states.iter().map(|s| Ok(*s)).collect())
    }

    /// Append answers while the probe is in use.
    pub fn push(&self, answer: Result<bool, CloudError>) {
        self.script.lock().unwrap().push_back(answer);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConnectionProbe for ScriptedProbe {
    fn is_connected(&mut self, _device_id: &str) -> Result<bool, CloudError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(answer) = next {
            *last = answer;
        }
        last.clone()
    }
}
