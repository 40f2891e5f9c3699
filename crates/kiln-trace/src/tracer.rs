//! Subscriber initialization and configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum TracerError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },
    #[error("Failed to initialize tracing: {0}")]
    Init(String),
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_enabled() -> bool {
    true
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            filter: default_filter(),
            format: LogFormat::default(),
        }
    }
}

impl TracingConfig {
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, TracerError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.filter).map_err(|e| TracerError::InvalidFilter {
            filter: self.filter.clone(),
            reason: e.to_string(),
        })
    }
}

/// Install the global subscriber. Does nothing when tracing is disabled.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TracerError> {
    if !config.enabled {
        return Ok(());
    }

    let env_filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
    .map_err(|e| TracerError::Init(e.to_string()))
}
