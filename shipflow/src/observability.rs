//! Tracing initialisation.
//!
//! Call [`init_tracing`] once at program start. `RUST_LOG` filters the
//! output; without it everything at `info` and above is logged.

use crate::errors::ShipflowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as fmt_layer, EnvFilter};

/// Output format of the log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// Newline-delimited JSON.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ShipflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ShipflowError::Logging(format!("unknown log format '{other}'"))),
        }
    }
}

/// Builds the filter from `RUST_LOG`, falling back to `default_level`.
#[must_use]
pub fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_str()))
}

/// Installs the global subscriber at the `info` default level.
pub fn init_tracing(format: LogFormat) -> Result<(), ShipflowError> {
    init_tracing_with_level(format, Level::INFO)
}

/// Installs the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing_with_level(format: LogFormat, default_level: Level) -> Result<(), ShipflowError> {
    let registry = tracing_subscriber::registry().with(env_filter(default_level));
    let result = match format {
        LogFormat::Json => registry
            .with(fmt_layer::layer().with_target(false).json())
            .try_init(),
        LogFormat::Text => registry.with(fmt_layer::layer().with_target(false)).try_init(),
    };
    result.map_err(|e| ShipflowError::Logging(e.to_string()))
}
