//! Diagnostic logging for the CLI.
//!
//! Environment variables:
//!
//! - `APNSKIT_LOG_LEVEL=trace|debug|info|warn|error|off` - log level (default `warn`)
//! - `APNSKIT_LOG_FORMAT=pretty|json|compact` - output format (default `compact`)
//! - `NO_COLOR` - disable ANSI colors
//! - `RUST_LOG` - full filter directives, overriding `APNSKIT_LOG_LEVEL`
//!
//! Logs go to stderr so command output on stdout stays clean.

use std::env;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LEVEL: &str = "warn";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Multi-line, human friendly.
    Pretty,
    /// One JSON object per event.
    Json,
    /// Single-line text.
    #[default]
    Compact,
}

impl Format {
    /// Parse a format name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "json" => Some(Format::Json),
            "compact" => Some(Format::Compact),
            _ => None,
        }
    }
}

fn level() -> String {
    env::var("APNSKIT_LOG_LEVEL")
        .ok()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level()))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let format = env::var("APNSKIT_LOG_FORMAT")
        .ok()
        .and_then(|f| Format::from_str(&f))
        .unwrap_or_default();
    let ansi = env::var_os("NO_COLOR").is_none();

    let registry = tracing_subscriber::registry().with(filter());
    let layer = fmt::layer().with_writer(std::io::stderr).with_ansi(ansi);

    let _ = match format {
        Format::Json => registry.with(layer.json()).try_init(),
        Format::Pretty => registry.with(layer.pretty()).try_init(),
        Format::Compact => registry.with(layer.compact()).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!(Format::from_str("pretty"), Some(Format::Pretty));
        assert_eq!(Format::from_str("JSON"), Some(Format::Json));
        assert_eq!(Format::from_str("compact"), Some(Format::Compact));
        assert_eq!(Format::from_str("invalid"), None);
        assert_eq!(Format::default(), Format::Compact);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init();
        tracing::debug!("still alive");
    }
}
