//! apnskit - command-line tool for interacting with APNs.
//!
//! # Commands
//!
//! - `apnskit auth generate-token` - Sign a provider token from a .p8 key
//! - `apnskit send alert` - Send a simple alert notification
//! - `apnskit send background` - Send a background notification
//! - `apnskit send raw` - Send a caller-assembled notification body

use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod error;
mod logging;

use commands::auth::{self, GenerateTokenArgs};
use commands::send::{self, AlertArgs, BackgroundArgs, RawArgs};
use error::CliResult;

/// apnskit - Apple Push Notification service tools
#[derive(Parser)]
#[command(name = "apnskit")]
#[command(version)]
#[command(about = "Command-line tool for interacting with APNs")]
#[command(long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = format!(
    "{}\n  {} apnskit auth generate-token --key-file AuthKey.p8 --key-id ABC123DEFG --team-id TEAM123456\n  {} apnskit send alert --app-id com.example.app --device-token <token> --alert-text Hello --sandbox \\\n      --key-file AuthKey.p8 --key-id ABC123DEFG --team-id TEAM123456",
    "Examples:".bright_cyan().bold(),
    "$".dimmed(),
    "$".dimmed(),
))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// APNs authentication commands
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// APNs send notification commands
    Send {
        #[command(subcommand)]
        command: SendCommands,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Generate JWT token from .p8 key
    GenerateToken(GenerateTokenArgs),
}

#[derive(Subcommand)]
enum SendCommands {
    /// Send simple alert notification through APNs
    Alert(AlertArgs),

    /// Send simple background notification through APNs
    Background(BackgroundArgs),

    /// Send raw notification through APNs
    Raw(RawArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init();

    let result: CliResult<()> = match cli.command {
        Commands::Auth { command } => match command {
            AuthCommands::GenerateToken(args) => auth::generate_token(args).await,
        },

        Commands::Send { command } => match command {
            SendCommands::Alert(args) => send::alert(args).await,
            SendCommands::Background(args) => send::background(args).await,
            SendCommands::Raw(args) => send::raw(args).await,
        },
    };

    if let Err(e) = result {
        tracing::debug!(status = ?e.status_code(), "Command failed");
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
