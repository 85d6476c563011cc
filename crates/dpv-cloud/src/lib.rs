//! dpv-cloud
//!
//! The cloud service as the verification code sees it: four narrow traits
//! (fetch records, delete a stream, send a device request, probe the
//! connection) and one blocking HTTP implementation of all of them.
//!
//! The service's wire grammar is owned elsewhere; this crate decodes only the
//! fields it needs and treats everything else as opaque.

mod client;
mod collaborator;
mod error;
pub mod sci;
pub mod wire;

pub use client::{Credentials, DeviceCloudClient, DEFAULT_REQUEST_TIMEOUT};
pub use collaborator::{ConnectionProbe, DeviceRequester, RecordFetcher, StreamAdmin};
pub use error::CloudError;
