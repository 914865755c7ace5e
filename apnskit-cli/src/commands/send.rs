//! Send commands - deliver alert, background and raw notifications.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use apnskit_push::{
    AlertNotification, ApnsClient, ApnsSettings, BackgroundNotification, Endpoint, Expiration,
    Notification, Priority, RawNotification, SendOperation,
};
use clap::Args;

use super::parse_duration;
use crate::error::CliResult;

/// Token authentication flags.
#[derive(Args, Debug, Default)]
pub struct TokenAuthArgs {
    /// Path to .p8 file containing APNs-enabled private key
    #[arg(long, value_name = "FILE")]
    pub key_file: Option<PathBuf>,

    /// Key ID for the APNs-enabled private key
    #[arg(long)]
    pub key_id: Option<String>,

    /// Apple Developer team ID
    #[arg(long)]
    pub team_id: Option<String>,

    /// Amount of time until the token expires (default 60m)
    #[arg(long, value_parser = parse_duration)]
    pub expires_after: Option<Duration>,
}

/// Certificate authentication flags.
#[derive(Args, Debug, Default)]
pub struct CertificateAuthArgs {
    /// Path to .p12 file containing APNs certificate
    #[arg(long, value_name = "FILE")]
    pub cert_file: Option<PathBuf>,

    /// Password of the .p12 file
    #[arg(long)]
    pub cert_password: Option<String>,
}

/// Flags shared by every send command.
#[derive(Args, Debug)]
pub struct SendArgs {
    /// App bundle ID
    #[arg(long)]
    pub app_id: Option<String>,

    /// APNs device token
    #[arg(long)]
    pub device_token: String,

    /// Use APNs sandbox endpoint
    #[arg(long)]
    pub sandbox: bool,

    /// Send to this base URL instead of Apple's servers
    #[arg(long, value_name = "URL", conflicts_with = "sandbox")]
    pub endpoint: Option<String>,

    /// TOML settings file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds (default 30)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging of the HTTP exchange
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub token: TokenAuthArgs,

    #[command(flatten)]
    pub certificate: CertificateAuthArgs,
}

impl SendArgs {
    fn flag_settings(&self) -> ApnsSettings {
        ApnsSettings {
            app_id: self.app_id.clone(),
            sandbox: self.sandbox.then_some(true),
            key_file: self.token.key_file.clone(),
            key_id: self.token.key_id.clone(),
            team_id: self.token.team_id.clone(),
            expires_after_secs: self.token.expires_after.map(|d| d.as_secs()),
            cert_file: self.certificate.cert_file.clone(),
            cert_password: self.certificate.cert_password.clone(),
            timeout_secs: self.timeout,
        }
    }

    /// Settings from the config file, then `.env` and `APNSKIT_*`, then flags.
    pub fn settings(&self) -> CliResult<ApnsSettings> {
        let file = match &self.config {
            Some(path) => ApnsSettings::from_file(path)?,
            None => ApnsSettings::default(),
        };

        ApnsSettings::load_dotenv(".env")?;
        let env = ApnsSettings::from_env()?;

        Ok(file.merge(env).merge(self.flag_settings()))
    }
}

/// Arguments for `send alert`.
#[derive(Args, Debug)]
pub struct AlertArgs {
    #[command(flatten)]
    pub common: SendArgs,

    /// Alert text
    #[arg(long)]
    pub alert_text: Option<String>,

    /// Badge count
    #[arg(long)]
    pub badge_count: Option<u32>,

    /// Sound name
    #[arg(long)]
    pub sound_name: Option<String>,

    /// Value for 'apns-expiration' header (Unix timestamp)
    #[arg(long)]
    pub expiration: Option<String>,

    /// Value for 'apns-priority' header
    #[arg(long)]
    pub priority: Option<String>,
}

/// Arguments for `send background`.
#[derive(Args, Debug)]
pub struct BackgroundArgs {
    #[command(flatten)]
    pub common: SendArgs,

    /// JSON formatted notification content
    #[arg(short, long)]
    pub data: Option<String>,
}

/// Arguments for `send raw`.
#[derive(Args, Debug)]
pub struct RawArgs {
    #[command(flatten)]
    pub common: SendArgs,

    /// Notification body, sent verbatim
    #[arg(short, long)]
    pub data: String,

    /// Value for 'apns-priority' header
    #[arg(long)]
    pub priority: Option<String>,

    /// Value for 'apns-push-type' header
    #[arg(long)]
    pub push_type: Option<String>,
}

/// Send a simple alert notification.
pub async fn alert(args: AlertArgs) -> CliResult<()> {
    let notification = AlertNotification {
        alert_text: args.alert_text,
        badge: args.badge_count,
        sound: args.sound_name,
        expiration: args.expiration.as_deref().map(Expiration::parse).transpose()?,
        priority: args.priority.as_deref().map(Priority::parse).transpose()?,
    };

    run(args.common, notification.into()).await
}

/// Send a background notification with optional custom data.
pub async fn background(args: BackgroundArgs) -> CliResult<()> {
    let notification = match args.data.as_deref().filter(|d| !d.is_empty()) {
        Some(data) => BackgroundNotification::from_json_str(data)?,
        None => BackgroundNotification::new(),
    };

    run(args.common, notification.into()).await
}

/// Send a raw notification.
pub async fn raw(args: RawArgs) -> CliResult<()> {
    let mut notification = RawNotification::new(args.data);
    notification.priority = args.priority;
    notification.push_type = args.push_type;

    run(args.common, notification.into()).await
}

async fn run(args: SendArgs, notification: Notification) -> CliResult<()> {
    let mut settings = args.settings()?;
    if args.endpoint.is_some() {
        // an explicit endpoint replaces the environment choice
        settings.sandbox = Some(false);
    }
    let timeout = settings.timeout();

    let mut client_config = settings.client_config();
    if let Some(url) = &args.endpoint {
        client_config.endpoint = Endpoint::Custom(url.clone());
    }

    let mut client = ApnsClient::new(client_config);
    if args.verbose {
        client.enable_logging(std::io::stdout());
    }

    let config = settings.into_send_config(args.device_token)?;
    let mut op = SendOperation::new(client, config, notification).with_timeout(timeout);
    let result = op.exec().await?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "Notification sent successfully")?;
    writeln!(out, "APNS-ID: {}", result.apns_id)?;

    Ok(())
}
