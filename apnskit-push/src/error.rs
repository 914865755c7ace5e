//! APNs error types.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for APNs operations.
pub type Result<T> = std::result::Result<T, ApnsError>;

/// APNs rejected a notification.
///
/// Produced only from a non-200 response. `reason` is the `reason` field of
/// the JSON error body, or empty when the body carried none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOperationError {
    /// HTTP status code returned by APNs.
    pub status_code: u16,
    /// Apple's textual reason, e.g. `BadDeviceToken`.
    pub reason: String,
}

impl SendOperationError {
    /// Create a new rejection.
    pub fn new(status_code: u16, reason: impl Into<String>) -> Self {
        Self {
            status_code,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SendOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Operation failed with error: {} {}",
            self.status_code, self.reason
        )
    }
}

impl std::error::Error for SendOperationError {}

/// APNs errors.
#[derive(Debug, Error)]
pub enum ApnsError {
    /// Malformed credential input (bad PEM, bad PKCS#12, wrong password).
    #[error("Decode error: {0}")]
    Decode(String),

    /// The private key is not an ECDSA key.
    #[error("Key type error: {0}")]
    KeyType(String),

    /// Provider token could not be signed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Notification body could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Network or TLS failure reaching APNs.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The send did not complete within its deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// APNs rejected the notification.
    #[error(transparent)]
    Rejected(#[from] SendOperationError),

    /// A caller-supplied value could not be used.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Settings could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error while reading a credential file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApnsError {
    /// Status code of an APNs rejection, if this is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Rejected(e) => Some(e.status_code),
            _ => None,
        }
    }

    /// Apple's rejection reason, if this is a rejection.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Rejected(e) => Some(e.reason.as_str()),
            _ => None,
        }
    }

    /// Check if this error indicates the device token should be dropped.
    pub fn should_remove_device(&self) -> bool {
        match self {
            Self::Rejected(e) => {
                e.status_code == 410
                    || (e.status_code == 400
                        && matches!(
                            e.reason.as_str(),
                            "BadDeviceToken" | "DeviceTokenNotForTopic"
                        ))
            }
            _ => false,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Nothing in this crate retries; this only informs callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Rejected(e) => e.status_code == 429 || e.status_code >= 500,
            _ => false,
        }
    }

    /// Check if this is a network-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for ApnsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not report the configured duration
            Self::Transport(format!("request timed out: {}", err))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApnsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
