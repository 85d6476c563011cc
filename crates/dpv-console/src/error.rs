use std::fmt;
use std::io;
use std::time::Duration;

/// Why a `[DataPoint]` line could not become a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// A required field (`Location`, `Quality`, `Data`) did not match.
    MissingField(&'static str),
    /// Only one of the two checksum renderings was printed.
    PartialChecksum,
}

/// A record line that the parser found but could not assemble.
///
/// `line` is 1-based within the buffer handed to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub line: usize,
    pub reason: MalformedReason,
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            MalformedReason::MissingField(name) => {
                write!(f, "record on line {} has no '{}' field", self.line, name)
            }
            MalformedReason::PartialChecksum => write!(
                f,
                "record on line {} carries only one of the crc32 DEC/HEX fields",
                self.line
            ),
        }
    }
}

impl std::error::Error for MalformedRecord {}

/// Failures while reading the console.
#[derive(Debug)]
pub enum ConsoleError {
    /// The marker did not show up within the wait window.
    ReadTimeout {
        pattern: String,
        waited: Duration,
        lines_buffered: usize,
    },
    /// The console source ended before the marker showed up.
    Closed {
        pattern: String,
        lines_buffered: usize,
    },
    /// Reading the source failed.
    Io(io::Error),
    /// The batch was read completely but a record line is unusable.
    Malformed(MalformedRecord),
}

impl ConsoleError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConsoleError::ReadTimeout { .. })
    }
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::ReadTimeout {
                pattern,
                waited,
                lines_buffered,
            } => write!(
                f,
                "console read timeout: '{pattern}' not seen after {}ms ({lines_buffered} lines read)",
                waited.as_millis()
            ),
            ConsoleError::Closed {
                pattern,
                lines_buffered,
            } => write!(
                f,
                "console closed before '{pattern}' was seen ({lines_buffered} lines read)"
            ),
            ConsoleError::Io(e) => write!(f, "console io error: {e}"),
            ConsoleError::Malformed(m) => write!(f, "malformed console record: {m}"),
        }
    }
}

impl std::error::Error for ConsoleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConsoleError::Io(e) => Some(e),
            ConsoleError::Malformed(m) => Some(m),
            _ => None,
        }
    }
}

impl From<io::Error> for ConsoleError {
    fn from(e: io::Error) -> Self {
        ConsoleError::Io(e)
    }
}

impl From<MalformedRecord> for ConsoleError {
    fn from(m: MalformedRecord) -> Self {
        ConsoleError::Malformed(m)
    }
}
