//! Layered settings for sending notifications.
//!
//! Sources are merged in order, later ones winning: a TOML file, then
//! `APNSKIT_*` environment variables, then whatever the caller sets last
//! (typically command-line flags).
//!
//! ```toml
//! app_id = "com.example.app"
//! sandbox = true
//! key_file = "AuthKey_ABC123DEFG.p8"
//! key_id = "ABC123DEFG"
//! team_id = "TEAM123456"
//! ```

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{ApnsClientConfig, Endpoint};
use crate::operation::{CertificateAuth, CredentialSource, SendConfig, TokenAuth};
use crate::token::DEFAULT_TOKEN_LIFETIME;
use crate::{ApnsError, Result};

/// Prefix of the environment variables read by [`ApnsSettings::from_env`].
pub const ENV_PREFIX: &str = "APNSKIT";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Trait for validating settings.
pub trait Validate {
    /// Check the settings for internal consistency.
    fn validate(&self) -> Result<()>;
}

/// Reusable validation rules.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ApnsError::Config(format!("{} cannot be empty", field)));
        }
        Ok(())
    }

    /// Validate that a number is positive
    pub fn positive(value: u64, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ApnsError::Config(format!("{} must be greater than zero", field)));
        }
        Ok(())
    }
}

/// Environment variable loader.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all matching environment variables, prefix stripped and keys lower-cased
    pub fn load(&self) -> HashMap<String, String> {
        self.filter(env::vars())
    }

    /// Apply the prefix rules to an arbitrary set of variables
    pub fn filter<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            match &self.prefix {
                Some(prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix.as_str()) {
                        if let Some(name) = rest.strip_prefix('_') {
                            config.insert(name.to_lowercase(), value);
                        }
                    }
                }
                None => {
                    config.insert(key.to_lowercase(), value);
                }
            }
        }

        config
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Settings for the send pipeline. Every field is optional so sources can
/// be layered with [`ApnsSettings::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApnsSettings {
    /// App bundle ID.
    pub app_id: Option<String>,
    /// Use the sandbox environment.
    pub sandbox: Option<bool>,
    /// Token auth: path of the `.p8` key.
    pub key_file: Option<PathBuf>,
    /// Token auth: key ID.
    pub key_id: Option<String>,
    /// Token auth: team ID.
    pub team_id: Option<String>,
    /// Token auth: token lifetime in seconds.
    pub expires_after_secs: Option<u64>,
    /// Certificate auth: path of the `.p12` archive.
    pub cert_file: Option<PathBuf>,
    /// Certificate auth: archive password.
    pub cert_password: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl ApnsSettings {
    /// Parse settings from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ApnsError::Config(format!("TOML parse error: {}", e)))
    }

    /// Read and parse a TOML settings file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ApnsError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Read `APNSKIT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(EnvLoader::new(Some(ENV_PREFIX.to_string())).load())
    }

    /// Build settings from already-filtered variables (keys without prefix,
    /// lower-cased). Unknown keys are ignored.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let text = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        Ok(Self {
            app_id: text("app_id"),
            sandbox: parse_var(&vars, "sandbox", parse_bool)?,
            key_file: text("key_file").map(PathBuf::from),
            key_id: text("key_id"),
            team_id: text("team_id"),
            expires_after_secs: parse_var(&vars, "expires_after_secs", u64::from_str)?,
            cert_file: text("cert_file").map(PathBuf::from),
            cert_password: vars.get("cert_password").cloned(),
            timeout_secs: parse_var(&vars, "timeout_secs", u64::from_str)?,
        })
    }

    /// Load a `.env` file into the process environment.
    ///
    /// Variables already set are left alone. A missing file is not an error.
    pub fn load_dotenv(path: impl AsRef<Path>) -> Result<()> {
        match dotenvy::from_path(path.as_ref()) {
            Ok(()) => Ok(()),
            Err(e) if e.not_found() => Ok(()),
            Err(e) => Err(ApnsError::Config(format!(
                "Failed to load {}: {}",
                path.as_ref().display(),
                e
            ))),
        }
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(mut self, other: ApnsSettings) -> Self {
        fn take<T>(base: &mut Option<T>, over: Option<T>) {
            if over.is_some() {
                *base = over;
            }
        }

        take(&mut self.app_id, other.app_id);
        take(&mut self.sandbox, other.sandbox);
        take(&mut self.key_file, other.key_file);
        take(&mut self.key_id, other.key_id);
        take(&mut self.team_id, other.team_id);
        take(&mut self.expires_after_secs, other.expires_after_secs);
        take(&mut self.cert_file, other.cert_file);
        take(&mut self.cert_password, other.cert_password);
        take(&mut self.timeout_secs, other.timeout_secs);
        self
    }

    /// Token lifetime, defaulting to 60 minutes.
    pub fn expires_after(&self) -> Duration {
        self.expires_after_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME)
    }

    /// Request timeout, defaulting to 30 seconds.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Whether the sandbox environment is selected.
    pub fn is_sandbox(&self) -> bool {
        self.sandbox.unwrap_or(false)
    }

    /// Transport settings derived from these settings.
    pub fn client_config(&self) -> ApnsClientConfig {
        ApnsClientConfig::builder()
            .endpoint(Endpoint::from_sandbox(self.is_sandbox()))
            .timeout(self.timeout())
            .build()
    }

    /// Produce the configuration of a send to `device_token`.
    ///
    /// Requires a non-empty app ID and device token.
    pub fn into_send_config(self, device_token: impl Into<String>) -> Result<SendConfig> {
        self.validate()?;

        let device_token = device_token.into();
        let app_id = self.app_id.clone().unwrap_or_default();
        ConfigValidator::not_empty(&app_id, "app_id")?;
        ConfigValidator::not_empty(&device_token, "device_token")?;

        let expires_after = self.expires_after();
        let mut config = SendConfig::new(app_id, device_token).sandbox(self.is_sandbox());

        if self.key_file.is_some() || self.key_id.is_some() || self.team_id.is_some() {
            if self.key_file.is_none() || self.key_id.is_none() || self.team_id.is_none() {
                tracing::warn!(
                    key_file = self.key_file.is_some(),
                    key_id = self.key_id.is_some(),
                    team_id = self.team_id.is_some(),
                    "Token auth is incomplete and will be skipped"
                );
            }
            config = config.token_auth(
                TokenAuth::new(
                    CredentialSource::File(self.key_file.unwrap_or_default()),
                    self.key_id.unwrap_or_default(),
                    self.team_id.unwrap_or_default(),
                )
                .expires_after(expires_after),
            );
        }

        if let Some(cert_file) = self.cert_file {
            config = config.certificate_auth(
                CertificateAuth::new(CredentialSource::File(cert_file))
                    .password(self.cert_password.unwrap_or_default()),
            );
        }

        Ok(config)
    }
}

impl Validate for ApnsSettings {
    fn validate(&self) -> Result<()> {
        if let Some(app_id) = &self.app_id {
            ConfigValidator::not_empty(app_id, "app_id")?;
        }
        if let Some(secs) = self.expires_after_secs {
            ConfigValidator::positive(secs, "expires_after_secs")?;
        }
        if let Some(secs) = self.timeout_secs {
            ConfigValidator::positive(secs, "timeout_secs")?;
        }
        Ok(())
    }
}

fn parse_var<T, E: std::fmt::Display>(
    vars: &HashMap<String, String>,
    key: &str,
    parse: impl Fn(&str) -> std::result::Result<T, E>,
) -> Result<Option<T>> {
    match vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(value) => parse(value)
            .map(Some)
            .map_err(|e| ApnsError::Config(format!("{}_{}: {}", ENV_PREFIX, key.to_uppercase(), e))),
        None => Ok(None),
    }
}

fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got {:?}", other)),
    }
}
