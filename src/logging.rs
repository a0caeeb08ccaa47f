//! Tracing subscriber setup for hosts and the CLI.

use crate::error::{CameraError, CameraResult};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Log levels accepted in `[application] log_level`.
pub const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Output format of the fmt subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored when attached to a terminal.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(CameraError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: pretty, json",
                other
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Build the filter: `RUST_LOG` wins, otherwise `level`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are ignored and return `false`.
pub fn init_tracing(level: &str, format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true);
    let installed = match format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };
    if installed {
        tracing::debug!(level, %format, "Tracing initialized");
    }
    installed
}

/// Validate a `log_level` value.
pub fn validate_level(level: &str) -> CameraResult<()> {
    if VALID_LEVELS.contains(&level) {
        Ok(())
    } else {
        Err(CameraError::Configuration(format!(
            "Invalid log_level '{}'. Must be one of: {}",
            level,
            VALID_LEVELS.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_validate_level() {
        assert!(validate_level("debug").is_ok());
        assert!(validate_level("verbose").is_err());
    }
}
