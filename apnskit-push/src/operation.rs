//! Send operations: resolve credentials, deliver one notification, interpret
//! the response.
//!
//! An operation walks through [`SendState`]s:
//!
//! ```text
//! Idle -> AuthResolved -> Sent -> Succeeded
//!                              \-> Failed
//! ```
//!
//! Any error before the response arrives goes straight to `Failed`.
//!
//! # Example
//!
//! ```rust,no_run
//! use apnskit_push::prelude::*;
//!
//! # async fn example() -> apnskit_push::Result<()> {
//! let config = SendConfig::new("com.example.app", "abc123")
//!     .sandbox(true)
//!     .token_auth(TokenAuth::new(
//!         CredentialSource::file("AuthKey_ABC123DEFG.p8"),
//!         "ABC123DEFG",
//!         "TEAM123456",
//!     ));
//!
//! let mut op = SendOperation::alert(
//!     ApnsClient::default(),
//!     config,
//!     AlertNotification::new("Hello").badge(3).sound("default"),
//! );
//! let result = op.exec().await?;
//! println!("APNS-ID: {}", result.apns_id);
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::auth::{load_certificate, load_private_key, ClientCertificate};
use crate::client::{Endpoint, Transport};
use crate::error::SendOperationError;
use crate::notification::{AlertNotification, BackgroundNotification, Notification, RawNotification};
use crate::token::{generate_token, AuthToken, DEFAULT_TOKEN_LIFETIME};
use crate::{redact_device_token, ApnsError, Result};

/// Where a credential comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Read from this path when the operation runs.
    File(PathBuf),
    /// Already in memory.
    Bytes(Vec<u8>),
}

impl CredentialSource {
    /// Credential read from `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Credential held in memory.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Whether the source names nothing (empty path or no bytes).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::File(path) => path.as_os_str().is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
        }
    }

    /// Load the credential bytes.
    pub fn read(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Self::File(path) => Ok(Cow::Owned(std::fs::read(path)?)),
            Self::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Bytes(bytes) => write!(f, "Bytes(<{} bytes>)", bytes.len()),
        }
    }
}

/// Provider-token authentication parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAuth {
    /// PEM-encoded PKCS#8 ECDSA key (`.p8`).
    pub key: CredentialSource,
    /// Key ID from the developer account.
    pub key_id: String,
    /// Team ID from the developer account.
    pub team_id: String,
    /// Token lifetime.
    pub expires_after: Duration,
}

impl TokenAuth {
    /// Token auth with the default lifetime.
    pub fn new(key: CredentialSource, key_id: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            key,
            key_id: key_id.into(),
            team_id: team_id.into(),
            expires_after: DEFAULT_TOKEN_LIFETIME,
        }
    }

    /// Set the token lifetime.
    pub fn expires_after(mut self, expires_after: Duration) -> Self {
        self.expires_after = expires_after;
        self
    }

    /// Whether key, key ID and team ID are all present.
    pub fn is_complete(&self) -> bool {
        !self.key.is_empty() && !self.key_id.is_empty() && !self.team_id.is_empty()
    }
}

/// Client-certificate authentication parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateAuth {
    /// PKCS#12 archive.
    pub certificate: CredentialSource,
    /// Archive password; empty for archives exported without one.
    pub password: String,
}

impl CertificateAuth {
    /// Certificate auth with an empty password.
    pub fn new(certificate: CredentialSource) -> Self {
        Self {
            certificate,
            password: String::new(),
        }
    }

    /// Set the archive password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Whether a certificate source is present.
    pub fn is_present(&self) -> bool {
        !self.certificate.is_empty()
    }
}

/// Parameters shared by every kind of send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendConfig {
    /// App bundle ID, sent as `apns-topic`.
    pub app_id: String,
    /// Target device token.
    pub device_token: String,
    /// Deliver through the sandbox environment.
    pub sandbox: bool,
    /// Token auth, used when complete.
    pub token_auth: Option<TokenAuth>,
    /// Certificate auth, used when token auth is not.
    pub certificate_auth: Option<CertificateAuth>,
}

impl SendConfig {
    /// Create a configuration without credentials.
    pub fn new(app_id: impl Into<String>, device_token: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            device_token: device_token.into(),
            sandbox: false,
            token_auth: None,
            certificate_auth: None,
        }
    }

    /// Select the sandbox environment.
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Set token auth.
    pub fn token_auth(mut self, auth: TokenAuth) -> Self {
        self.token_auth = Some(auth);
        self
    }

    /// Set certificate auth.
    pub fn certificate_auth(mut self, auth: CertificateAuth) -> Self {
        self.certificate_auth = Some(auth);
        self
    }
}

/// The credential an operation settled on.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Freshly signed provider token.
    Token(AuthToken),
    /// Decoded client certificate.
    Certificate(ClientCertificate),
    /// No credential; APNs is expected to reject the request.
    Unauthenticated,
}

impl AuthMode {
    /// Short name of the mode.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Token(_) => "token",
            Self::Certificate(_) => "certificate",
            Self::Unauthenticated => "none",
        }
    }
}

/// Progress of a [`SendOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    /// Not run yet.
    Idle,
    /// Credentials resolved and configured on the transport.
    AuthResolved,
    /// Response received, not yet interpreted.
    Sent,
    /// APNs accepted the notification.
    Succeeded,
    /// Something failed.
    Failed,
}

/// Outcome of an accepted notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOperationResult {
    /// The `apns-id` APNs assigned to the notification.
    pub apns_id: String,
}

/// One notification delivery over a [`Transport`].
#[derive(Debug)]
pub struct SendOperation<T: Transport> {
    config: SendConfig,
    notification: Notification,
    transport: T,
    timeout: Option<Duration>,
    state: SendState,
}

impl<T: Transport> SendOperation<T> {
    /// Create an operation for any notification kind.
    pub fn new(transport: T, config: SendConfig, notification: impl Into<Notification>) -> Self {
        Self {
            config,
            notification: notification.into(),
            transport,
            timeout: None,
            state: SendState::Idle,
        }
    }

    /// Send an alert.
    pub fn alert(transport: T, config: SendConfig, alert: AlertNotification) -> Self {
        Self::new(transport, config, alert)
    }

    /// Send a background notification.
    pub fn background(transport: T, config: SendConfig, background: BackgroundNotification) -> Self {
        Self::new(transport, config, background)
    }

    /// Send a raw body.
    pub fn raw(transport: T, config: SendConfig, raw: RawNotification) -> Self {
        Self::new(transport, config, raw)
    }

    /// Fail with [`ApnsError::Timeout`] if the send takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Current state.
    pub fn state(&self) -> SendState {
        self.state
    }

    /// Shared send parameters.
    pub fn config(&self) -> &SendConfig {
        &self.config
    }

    /// The notification to deliver.
    pub fn notification(&self) -> &Notification {
        &self.notification
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Consume the operation and return the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Pick the credential to use and load it.
    ///
    /// Complete token auth wins over certificate auth. A token is signed on
    /// every call.
    pub fn resolve_auth(&self) -> Result<AuthMode> {
        if let Some(token_auth) = self.config.token_auth.as_ref().filter(|a| a.is_complete()) {
            let pem = token_auth.key.read()?;
            let key = load_private_key(&pem)?;
            let token = generate_token(
                &key,
                &token_auth.key_id,
                &token_auth.team_id,
                Utc::now(),
                token_auth.expires_after,
            )?;
            return Ok(AuthMode::Token(token));
        }

        if let Some(cert_auth) = self.config.certificate_auth.as_ref().filter(|a| a.is_present()) {
            let archive = cert_auth.certificate.read()?;
            let certificate = load_certificate(&archive, &cert_auth.password)?;
            return Ok(AuthMode::Certificate(certificate));
        }

        Ok(AuthMode::Unauthenticated)
    }

    /// Run the operation.
    ///
    /// Returns the delivery ID on a 200 response and
    /// [`ApnsError::Rejected`] on any other status.
    pub async fn exec(&mut self) -> Result<SendOperationResult> {
        self.state = SendState::Idle;

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.run()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ApnsError::Timeout(limit)),
            },
            None => self.run().await,
        };

        if let Err(err) = &outcome {
            self.state = SendState::Failed;
            warn!(
                kind = self.notification.kind(),
                device = %redact_device_token(&self.config.device_token),
                error = %err,
                "Notification send failed"
            );
        }

        outcome
    }

    async fn run(&mut self) -> Result<SendOperationResult> {
        let (headers, body) = self.notification.build(&self.config.app_id)?;

        if self.config.sandbox {
            self.transport.configure_endpoint(Endpoint::Sandbox);
        }

        let auth = self.resolve_auth()?;
        debug!(auth = auth.name(), "Resolved APNs authentication");
        match auth {
            AuthMode::Token(token) => self.transport.configure_token_auth(token.into_string()),
            AuthMode::Certificate(certificate) => self.transport.configure_certificate_auth(certificate),
            AuthMode::Unauthenticated => {}
        }
        self.state = SendState::AuthResolved;

        let result = self
            .transport
            .send(&self.config.device_token, &headers, &body)
            .await?;
        self.state = SendState::Sent;

        if !result.success() {
            return Err(SendOperationError::new(result.status(), result.error_reason()).into());
        }

        self.state = SendState::Succeeded;
        info!(
            kind = self.notification.kind(),
            device = %redact_device_token(&self.config.device_token),
            apns_id = %result.id(),
            "Notification sent"
        );

        Ok(SendOperationResult {
            apns_id: result.id().to_string(),
        })
    }
}
