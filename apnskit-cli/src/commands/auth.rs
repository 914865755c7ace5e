//! Auth commands - provider token generation.

use std::path::PathBuf;
use std::time::Duration;

use apnskit_push::generate_token_from_pem;
use chrono::Utc;
use clap::Args;

use super::parse_duration;
use crate::error::CliResult;

/// Arguments for `auth generate-token`.
#[derive(Args, Debug)]
pub struct GenerateTokenArgs {
    /// Path to .p8 file containing APNs-enabled private key
    #[arg(long, value_name = "FILE")]
    pub key_file: PathBuf,

    /// Key ID for the APNs-enabled private key
    #[arg(long)]
    pub key_id: String,

    /// Apple Developer team ID
    #[arg(long)]
    pub team_id: String,

    /// Amount of time until the token expires (e.g. 3600, 90s, 60m, 1h)
    #[arg(long, default_value = "60m", value_parser = parse_duration)]
    pub expires_after: Duration,
}

/// Sign a provider token and print it.
pub async fn generate_token(args: GenerateTokenArgs) -> CliResult<()> {
    let pem = tokio::fs::read(&args.key_file).await?;
    let token = generate_token_from_pem(
        &pem,
        &args.key_id,
        &args.team_id,
        Utc::now(),
        args.expires_after,
    )?;

    tracing::debug!(key_id = %token.key_id(), expires_at = token.expires_at(), "Generated token");
    println!("{}", token);

    Ok(())
}
