//! dpv-console
//!
//! Reads what the device prints on its console and turns `[DataPoint]` lines
//! into [`ConsoleRecord`](dpv_schemas::ConsoleRecord) values.
//!
//! - `parser`: stateless extraction of records from a text buffer.
//! - `stream`: a line reader over any byte source with a bounded wait for a
//!   marker line. Running past the wait window is a hard `ReadTimeout`.
//! - `batch`: the two reads a scenario performs (end of batch, end of thread).

mod batch;
mod error;
mod parser;
mod stream;

pub use batch::{read_batch, wait_thread_finished};
pub use error::{ConsoleError, MalformedReason, MalformedRecord};
pub use parser::{ConsoleFields, FieldBlocks, RecordParser, Records};
pub use stream::{ConsoleCapture, ConsoleStream};

use std::time::Duration;

/// Literal tag that opens a record line.
pub const DATAPOINT_MARKER: &str = "[DataPoint]";

/// Line printed by the device after every batch of records.
pub const BATCH_TERMINATOR: &str = "END LOOP ----------------------------------------";

/// Printed once the device-side upload thread has finished all its batches.
pub const THREAD_FINISHED: &str = "Finished the Thread for";

/// Default wait window for either terminator.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(60);
