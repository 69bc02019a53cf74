//! Tracing subscriber setup for the binaries.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! crate and `warn` to everything else.

use crate::config::EditorConfig;
use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable with colors
    #[default]
    Pretty,
    /// Single line, no colors
    Compact,
}

/// Build the filter used when `RUST_LOG` is absent
pub fn default_filter(level: &str) -> Result<EnvFilter> {
    let level = level.to_lowercase();
    EnvFilter::try_new(format!("warn,workflow_graph_editor={level}"))
        .with_context(|| format!("Invalid log level '{}'", level))
}

/// Initialise the global subscriber from the editor configuration
pub fn init_from_config(config: &EditorConfig, format: LogFormat) -> Result<()> {
    init(&config.log_level, format)
}

/// Initialise the global subscriber.
///
/// Calling this more than once is harmless; later calls keep the first
/// subscriber.
pub fn init(level: &str, format: LogFormat) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter(level)?,
    };

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().compact().with_ansi(false))
            .try_init(),
    };

    match result {
        Err(e) if e.to_string().contains("already been set") => Ok(()),
        other => other.context("Failed to initialize tracing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_accepts_known_levels() {
        for level in ["trace", "debug", "info", "warn", "error", "DEBUG"] {
            assert!(default_filter(level).is_ok(), "{level}");
        }
    }

    #[test]
    fn test_default_filter_rejects_garbage() {
        let err = default_filter("loud").unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_init_is_idempotent() {
        assert!(init("info", LogFormat::Compact).is_ok());
        assert!(init("debug", LogFormat::Pretty).is_ok());
    }
}
