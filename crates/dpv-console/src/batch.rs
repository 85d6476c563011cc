use std::time::Duration;

use dpv_schemas::ConsoleRecord;
use tracing::{debug, info};

use crate::error::ConsoleError;
use crate::parser::RecordParser;
use crate::stream::{ConsoleCapture, ConsoleStream};
use crate::{BATCH_TERMINATOR, THREAD_FINISHED};

/// Read one batch (up to the end-of-batch line) and parse its records.
pub fn read_batch(
    stream: &mut ConsoleStream,
    parser: &RecordParser,
    timeout: Duration,
) -> Result<Vec<ConsoleRecord>, ConsoleError> {
    let capture = stream.read_until(BATCH_TERMINATOR, timeout)?;
    let records = parser.collect(&capture.text())?;
    debug!(
        lines = capture.lines.len(),
        records = records.len(),
        "console batch parsed"
    );
    Ok(records)
}

/// Wait for the device to report that its upload thread is done.
pub fn wait_thread_finished(
    stream: &mut ConsoleStream,
    timeout: Duration,
) -> Result<ConsoleCapture, ConsoleError> {
    let capture = stream.read_until(THREAD_FINISHED, timeout)?;
    info!(
        line = capture.matched_line().unwrap_or_default(),
        "device thread finished"
    );
    Ok(capture)
}
