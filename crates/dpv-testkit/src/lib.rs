//! Deterministic fakes and console fixtures for scenario tests.
//!
//! No network, no wall-clock waits. Every fake keeps a log of the calls it
//! received so tests can assert on exactly what was asked of the cloud.

pub mod console;
pub mod delay;
pub mod fake_cloud;
pub mod probe;

pub use console::{
    batch_text, binary_line, console_pipe, scalar_line, ChannelReader, ConsoleWriter,
};
pub use delay::RecordingDelay;
pub use fake_cloud::{DeviceRequestCall, FakeCloud, FetchCall, ScriptedFetcher};
pub use probe::ScriptedProbe;
