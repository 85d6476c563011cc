use std::fmt;

/// Errors returned by the cloud collaborators.
///
/// Callers that retry (the reconciliation loop) only log the `Display` text;
/// the variants exist for callers that want to branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    /// Network or transport failure.
    Transport(String),
    /// The service answered with a non-success status or an error document.
    Api { status: Option<u16>, body: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// The requested device or resource does not exist.
    NotFound(String),
    /// Client construction or credentials are unusable.
    Config(String),
}

impl fmt::Display for CloudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudError::Transport(msg) => write!(f, "transport error: {msg}"),
            CloudError::Api {
                status: Some(s),
                body,
            } => write!(f, "cloud api error status={s}: {body}"),
            CloudError::Api { status: None, body } => write!(f, "cloud api error: {body}"),
            CloudError::Decode(msg) => write!(f, "decode error: {msg}"),
            CloudError::NotFound(what) => write!(f, "not found: {what}"),
            CloudError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for CloudError {}

impl From<reqwest::Error> for CloudError {
    fn from(e: reqwest::Error) -> Self {
        CloudError::Transport(e.to_string())
    }
}
