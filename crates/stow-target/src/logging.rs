//! Tracing subscriber setup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt as layer_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::StowConfig;
use crate::error::{TargetError, TargetResult};

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "STOW_LOG_FORMAT";

/// Output format for log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, for log aggregation.
    #[default]
    Json,
    /// Human-readable lines.
    Text,
}

impl LogFormat {
    /// `STOW_LOG_FORMAT` if set, otherwise `configured`.
    pub fn from_env_or(configured: Self) -> TargetResult<Self> {
        Self::select(std::env::var(LOG_FORMAT_ENV), configured)
    }

    fn select(env: Result<String, std::env::VarError>, configured: Self) -> TargetResult<Self> {
        match env {
            Ok(value) => value.parse(),
            Err(std::env::VarError::NotPresent) => Ok(configured),
            Err(e) => Err(TargetError::Configuration(format!("{LOG_FORMAT_ENV}: {e}"))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(TargetError::Configuration(format!(
                "unknown log format {other:?}, expected \"json\" or \"text\""
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Install the global subscriber.
///
/// The level filter comes from `RUST_LOG` and defaults to `info`. Returns
/// `false` if a subscriber was already installed, which is left in place.
pub fn init_logging(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer_fmt::layer().json().with_current_span(true).with_target(true))
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(layer_fmt::layer().with_target(true))
            .try_init(),
    }
    .is_ok();
    if installed {
        tracing::debug!(format = %format, "logging initialized");
    }
    installed
}

/// Install the global subscriber in the format chosen by `STOW_LOG_FORMAT`,
/// falling back to `config.log_format`.
pub fn init_logging_from(config: &StowConfig) -> TargetResult<bool> {
    let format = LogFormat::from_env_or(config.log_format)?;
    Ok(init_logging(format))
}
