//! HTTP/2 transport to the APNs device endpoint.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use tracing::debug;

use crate::auth::ClientCertificate;
use crate::notification::Headers;
use crate::response::SendResult;
use crate::{ApnsError, Result};

/// Production APNs host.
pub const PRODUCTION_HOST: &str = "api.push.apple.com";
/// Sandbox (development) APNs host.
pub const SANDBOX_HOST: &str = "api.sandbox.push.apple.com";
/// Path prefix of the device endpoint; the device token is appended.
pub const DEVICE_PATH: &str = "/3/device/";

/// APNs environment to deliver to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// `https://api.push.apple.com`.
    #[default]
    Production,
    /// `https://api.sandbox.push.apple.com`.
    Sandbox,
    /// Any other base URL, e.g. a local test server or a proxy.
    Custom(String),
}

impl Endpoint {
    /// Pick the sandbox or production endpoint.
    pub fn from_sandbox(sandbox: bool) -> Self {
        if sandbox { Self::Sandbox } else { Self::Production }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        match self {
            Self::Production => format!("https://{}", PRODUCTION_HOST),
            Self::Sandbox => format!("https://{}", SANDBOX_HOST),
            Self::Custom(url) => url.trim_end_matches('/').to_string(),
        }
    }

    /// URL of the device endpoint for `device_token`.
    pub fn device_url(&self, device_token: &str) -> Result<url::Url> {
        let raw = format!("{}{}{}", self.base_url(), DEVICE_PATH, device_token);
        url::Url::parse(&raw)
            .map_err(|e| ApnsError::InvalidParameter(format!("invalid device URL {:?}: {}", raw, e)))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct ApnsClientConfig {
    /// Where notifications are delivered.
    pub endpoint: Endpoint,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ApnsClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Production,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("apnskit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApnsClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ApnsClientConfigBuilder {
        ApnsClientConfigBuilder::default()
    }
}

/// Builder for [`ApnsClientConfig`].
#[derive(Debug, Default)]
pub struct ApnsClientConfigBuilder {
    config: ApnsClientConfig,
}

impl ApnsClientConfigBuilder {
    /// Set the endpoint.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.config.endpoint = endpoint;
        self
    }

    /// Use the sandbox endpoint.
    pub fn sandbox(self) -> Self {
        self.endpoint(Endpoint::Sandbox)
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ApnsClientConfig {
        self.config
    }
}

/// Sends one request to APNs and returns the raw response.
///
/// Configuration takes `&mut self`, so it cannot change while a send
/// borrowing the same transport is in flight.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Set the endpoint subsequent sends go to.
    fn configure_endpoint(&mut self, endpoint: Endpoint);

    /// Authenticate with `Authorization: Bearer <token>`.
    fn configure_token_auth(&mut self, token: String);

    /// Authenticate with a TLS client certificate.
    fn configure_certificate_auth(&mut self, certificate: ClientCertificate);

    /// POST `body` to the device endpoint of `device_token`.
    ///
    /// Any HTTP status is a successful return. Errors are local or network
    /// failures only.
    async fn send(&self, device_token: &str, headers: &Headers, body: &[u8]) -> Result<SendResult>;
}

/// `reqwest`-backed [`Transport`] that speaks HTTP/2 only.
pub struct ApnsClient {
    config: ApnsClientConfig,
    bearer_token: Option<String>,
    certificate: Option<ClientCertificate>,
    log_writer: Mutex<Option<Box<dyn Write + Send>>>,
}

impl ApnsClient {
    /// Create a client with the given configuration and no credentials.
    pub fn new(config: ApnsClientConfig) -> Self {
        Self {
            config,
            bearer_token: None,
            certificate: None,
            log_writer: Mutex::new(None),
        }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ApnsClientConfig {
        &self.config
    }

    /// Write every request and response to `writer`, curl style.
    ///
    /// The log includes the bearer token. Do not enable it where the
    /// output may be retained.
    pub fn enable_logging(&mut self, writer: impl Write + Send + 'static) {
        *self.log_writer.get_mut() = Some(Box::new(writer));
    }

    /// Stop writing the wire log.
    pub fn disable_logging(&mut self) {
        *self.log_writer.get_mut() = None;
    }

    fn log(&self, line: fmt::Arguments<'_>) {
        if let Some(writer) = self.log_writer.lock().as_mut() {
            // the wire log is best effort
            let _ = writer.write_fmt(line);
            let _ = writer.write_all(b"\n");
        }
    }

    fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .http2_prior_knowledge()
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .user_agent(&self.config.user_agent);

        if let Some(certificate) = &self.certificate {
            self.log(format_args!("* Using client certificate"));
            builder = builder.identity(certificate.identity()?);
        }

        builder
            .build()
            .map_err(|e| ApnsError::Transport(format!("failed to build HTTP client: {}", e)))
    }

    fn request_headers(&self, headers: &Headers) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(headers.len() + 1);
        for (name, value) in headers.iter() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApnsError::InvalidParameter(format!("invalid header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApnsError::InvalidParameter(format!("invalid value for header {}: {}", name, e)))?;
            map.insert(name, value);
        }

        if self.certificate.is_none() {
            if let Some(token) = &self.bearer_token {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| ApnsError::InvalidParameter(format!("invalid bearer token: {}", e)))?;
                map.insert(AUTHORIZATION, value);
            }
        }

        Ok(map)
    }
}

impl Default for ApnsClient {
    fn default() -> Self {
        Self::new(ApnsClientConfig::default())
    }
}

impl fmt::Debug for ApnsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApnsClient")
            .field("config", &self.config)
            .field("token_auth", &self.bearer_token.is_some())
            .field("certificate_auth", &self.certificate.is_some())
            .finish()
    }
}

#[async_trait]
impl Transport for ApnsClient {
    fn configure_endpoint(&mut self, endpoint: Endpoint) {
        self.config.endpoint = endpoint;
    }

    fn configure_token_auth(&mut self, token: String) {
        self.bearer_token = Some(token);
    }

    fn configure_certificate_auth(&mut self, certificate: ClientCertificate) {
        self.certificate = Some(certificate);
    }

    async fn send(&self, device_token: &str, headers: &Headers, body: &[u8]) -> Result<SendResult> {
        let url = self.config.endpoint.device_url(device_token)?;
        let client = self.http_client()?;
        let request_headers = self.request_headers(headers)?;

        debug!(
            device = %crate::redact_device_token(device_token),
            endpoint = %self.config.endpoint,
            bytes = body.len(),
            "Sending APNs notification"
        );

        self.log(format_args!("* Sending request:"));
        self.log(format_args!("> POST {}", url));
        for (name, value) in &request_headers {
            self.log(format_args!("> {}: {}", name, value.to_str().unwrap_or_default()));
        }
        self.log(format_args!("> {}", String::from_utf8_lossy(body)));

        let response = client
            .post(url)
            .headers(request_headers)
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| {
                self.log(format_args!("* Error sending request: {}", e));
                ApnsError::from(e)
            })?;

        let status = response.status();
        self.log(format_args!("* Received response:"));
        self.log(format_args!("< {}", status));
        for (name, value) in response.headers() {
            self.log(format_args!("< {}: {}", name, value.to_str().unwrap_or_default()));
        }

        let result = SendResult::from_reqwest(response).await.map_err(|e| {
            self.log(format_args!("* Error reading response body: {}", e));
            e
        })?;

        self.log(format_args!("< {}", String::from_utf8_lossy(result.body())));
        self.log(format_args!("* Done"));

        debug!(status = result.status(), apns_id = %result.id(), "APNs responded");

        Ok(result)
    }
}
