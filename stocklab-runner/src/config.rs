//! Session configuration loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! lookback_days = 1825
//!
//! [provider]
//! timeout_secs = 30
//! max_retries = 0
//!
//! [indicators]
//! ma_windows = [20, 50]
//! rsi_period = 14
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocklab_core::data::{ProviderSettings, DEFAULT_LOOKBACK_DAYS};
use stocklab_core::indicators::{IndicatorSettings, SettingsError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("invalid [indicators] section: {0}")]
    Indicators(#[from] SettingsError),
}

/// Configuration for a `StockSession`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// History fetched when no start date is given.
    pub lookback_days: i64,
    pub provider: ProviderSettings,
    pub indicators: IndicatorSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            provider: ProviderSettings::default(),
            indicators: IndicatorSettings::default(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.lookback_days <= 0 {
            return Err(invalid("lookback_days", "must be positive"));
        }
        if self.provider.timeout_secs == 0 {
            return Err(invalid("provider.timeout_secs", "must be positive"));
        }

        self.indicators.validate()?;
        Ok(())
    }
}
