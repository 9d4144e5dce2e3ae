//! Tracing subscriber setup for the CLI.
//!
//! Filter precedence: `ACTIONZONE_LOG`, then the configured level, then `info`.
//! Events go to stderr so report output on stdout stays clean.

use crate::domain::config_validation::LOGGING;
use crate::domain::error::BacktestError;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "ACTIONZONE_LOG";
pub const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

pub fn resolve_filter(env_value: Option<String>, configured: Option<&str>) -> String {
    env_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_tracing(level: Option<&str>, format: LogFormat) -> Result<(), BacktestError> {
    let filter = resolve_filter(std::env::var(LOG_ENV_VAR).ok(), level);
    let env_filter = EnvFilter::try_new(&filter).map_err(|err| BacktestError::ConfigInvalid {
        section: LOGGING.to_string(),
        key: "level".to_string(),
        reason: format!("invalid log filter '{filter}': {err}"),
    })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
