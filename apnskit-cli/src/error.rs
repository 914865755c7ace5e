//! Error types for the apnskit CLI.

use std::fmt;

use apnskit_push::ApnsError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug)]
pub enum CliError {
    /// Error from the APNs pipeline (credentials, transport, rejection)
    Apns(ApnsError),

    /// IO error reading input or writing output
    Io(std::io::Error),
}

impl CliError {
    /// HTTP status of an APNs rejection, if this is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CliError::Apns(e) => e.status_code(),
            _ => None,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Apns(e) => write!(f, "{}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ApnsError> for CliError {
    fn from(e: ApnsError) -> Self {
        CliError::Apns(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
