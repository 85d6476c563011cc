//! Console text the way the device prints it, and an in-memory console pipe.

use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver, Sender};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dpv_console::{BATCH_TERMINATOR, DATAPOINT_MARKER};
use dpv_reconcile::Checksum;
use dpv_schemas::CloudRecord;

/// One scalar `[DataPoint]` line.
pub fn scalar_line(location: &str, quality: &str, data: &str) -> String {
    format!("{DATAPOINT_MARKER} Location: '{location}' Quality: '{quality}' Data: '{data}'")
}

/// One binary `[DataPoint]` line for `payload`, plus the cloud record that
/// stores the same payload.
pub fn binary_line(location: &str, quality: &str, payload: &[u8]) -> (String, CloudRecord) {
    let sum = Checksum::of(payload);
    let line = format!(
        "{DATAPOINT_MARKER} Location: '{location}' Quality: '{quality}' \
         Data crc32_DEC: '{}' Data crc32_HEX: '{}'",
        sum.decimal(),
        sum.hex()
    );
    (line, CloudRecord::new(location, quality, STANDARD.encode(payload)))
}

/// Lines of one batch followed by the batch terminator, newline-terminated.
pub fn batch_text<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for l in lines {
        out.push_str(l.as_ref());
        out.push('\n');
    }
    out.push_str(BATCH_TERMINATOR);
    out.push('\n');
    out
}

/// Read half of [`console_pipe`]. Blocks until text is written; ends when the
/// writer is dropped.
pub struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

/// Write half of [`console_pipe`].
#[derive(Clone)]
pub struct ConsoleWriter {
    tx: Sender<Vec<u8>>,
}

pub fn console_pipe() -> (ConsoleWriter, ChannelReader) {
    let (tx, rx) = mpsc::channel();
    (
        ConsoleWriter { tx },
        ChannelReader {
            rx,
            pending: Vec::new(),
        },
    )
}

impl ConsoleWriter {
    /// Send raw text. Returns false once the reader is gone.
    pub fn write(&self, text: &str) -> bool {
        self.tx.send(text.as_bytes().to_vec()).is_ok()
    }

    pub fn line(&self, line: &str) -> bool {
        self.write(&format!("{line}\n"))
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}
