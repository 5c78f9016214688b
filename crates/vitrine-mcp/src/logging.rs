//! Tracing setup for the stdio server.
//!
//! stdout carries the MCP protocol, so every log line goes to stderr.

use std::env;
use std::io;

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Fallback filter variable, consulted when `RUST_LOG` is unset.
pub const LOG_ENV: &str = "VITRINE_LOG";
/// `json` switches to one JSON object per line.
pub const LOG_FORMAT_ENV: &str = "VITRINE_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_vars(
            env::var("RUST_LOG").ok(),
            env::var(LOG_ENV).ok(),
            env::var(LOG_FORMAT_ENV).ok(),
        )
    }

    fn from_vars(rust_log: Option<String>, fallback: Option<String>, format: Option<String>) -> Self {
        let filter = rust_log
            .into_iter()
            .chain(fallback)
            .find(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());
        let format = match format.as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        LoggingConfig { filter, format }
    }
}

pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| anyhow!("invalid log filter '{}': {}", config.filter, e))?;
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_ansi(false);

    let installed = match config.format {
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))?;

    tracing::debug!(filter = %config.filter, format = ?config.format, "logging initialized");
    Ok(())
}
