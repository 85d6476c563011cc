//! Line reader over a device console.
//!
//! The source (serial device, telnet socket, capture file, stdin) is moved onto
//! a dedicated reader thread so that waiting for a marker can be bounded. Lines
//! that arrive after a capture ends stay queued for the next `read_until`.

use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::ConsoleError;

enum ReaderEvent {
    Line(String),
    Eof,
    Failed(io::Error),
}

/// Lines read up to and including the one that contained the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleCapture {
    pub lines: Vec<String>,
}

impl ConsoleCapture {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// The line that ended the capture.
    pub fn matched_line(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}

pub struct ConsoleStream {
    rx: Receiver<ReaderEvent>,
    closed: bool,
}

impl ConsoleStream {
    /// Start reading `source` on a background thread.
    pub fn spawn<R>(source: R) -> Result<Self, ConsoleError>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("dpv-console-reader".to_string())
            .spawn(move || {
                let mut reader = BufReader::new(source);
                let mut buf = Vec::new();
                loop {
                    buf.clear();
                    match reader.read_until(b'\n', &mut buf) {
                        Ok(0) => {
                            let _ = tx.send(ReaderEvent::Eof);
                            return;
                        }
                        Ok(_) => {
                            // Device consoles are not guaranteed to be valid UTF-8.
                            let line = String::from_utf8_lossy(&buf)
                                .trim_end_matches(['\r', '\n'])
                                .to_string();
                            if tx.send(ReaderEvent::Line(line)).is_err() {
                                return;
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            let _ = tx.send(ReaderEvent::Failed(e));
                            return;
                        }
                    }
                }
            })?;

        Ok(Self { rx, closed: false })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read lines until one contains `pattern`, waiting at most `timeout`.
    ///
    /// Running out of time is `ReadTimeout`; the source ending first is
    /// `Closed`. Neither returns the partial buffer as a capture.
    pub fn read_until(
        &mut self,
        pattern: &str,
        timeout: Duration,
    ) -> Result<ConsoleCapture, ConsoleError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut lines: Vec<String> = Vec::new();

        loop {
            if self.closed {
                return Err(ConsoleError::Closed {
                    pattern: pattern.to_string(),
                    lines_buffered: lines.len(),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    pattern,
                    lines_buffered = lines.len(),
                    "console marker not seen within wait window"
                );
                return Err(ConsoleError::ReadTimeout {
                    pattern: pattern.to_string(),
                    waited: now.duration_since(started),
                    lines_buffered: lines.len(),
                });
            }

            match self.rx.recv_timeout(deadline - now) {
                Ok(ReaderEvent::Line(line)) => {
                    let hit = line.contains(pattern);
                    lines.push(line);
                    if hit {
                        debug!(pattern, lines = lines.len(), "console marker seen");
                        return Ok(ConsoleCapture { lines });
                    }
                }
                Ok(ReaderEvent::Eof) | Err(RecvTimeoutError::Disconnected) => {
                    self.closed = true;
                }
                Ok(ReaderEvent::Failed(e)) => {
                    self.closed = true;
                    return Err(ConsoleError::Io(e));
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Loop once more so the deadline branch reports the timeout.
                }
            }
        }
    }
}
