//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable support for the strategy session label.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::InstrumentSpec;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Label tagging every order of this strategy session
    pub label: String,
    pub instrument: InstrumentSpec,
    /// Registered strategy to construct
    #[serde(default = "default_strategy_name")]
    pub strategy_name: String,
    /// Strategy-specific parameters, parsed by the selected strategy
    #[serde(default = "default_strategy_params")]
    pub strategy: serde_json::Value,
}

fn default_strategy_name() -> String {
    "trend_channel".to_string()
}

fn default_strategy_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config = Self::from_json(&contents)?;

        // Session label from environment wins over the file
        if let Ok(label) = std::env::var("STRATEGY_LABEL") {
            config.label = label;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string without environment overrides
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config JSON")
    }

    /// Reject configurations no strategy could run with
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            bail!("label must not be empty");
        }
        let instrument = &self.instrument;
        if instrument.symbol.as_str().trim().is_empty() {
            bail!("instrument.symbol must not be empty");
        }
        if instrument.pip_size <= 0.0 {
            bail!("instrument.pip_size must be positive, got {}", instrument.pip_size);
        }
        if instrument.lot_size <= 0.0 {
            bail!("instrument.lot_size must be positive, got {}", instrument.lot_size);
        }
        if instrument.volume_step <= 0.0 {
            bail!(
                "instrument.volume_step must be positive, got {}",
                instrument.volume_step
            );
        }
        if instrument.min_volume > instrument.max_volume {
            bail!(
                "instrument.min_volume ({}) exceeds max_volume ({})",
                instrument.min_volume,
                instrument.max_volume
            );
        }
        Ok(())
    }

    /// Parse the `strategy` section into a strategy's parameter struct
    pub fn strategy_params<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.strategy.clone()).with_context(|| {
            format!(
                "Failed to parse strategy parameters for '{}'",
                self.strategy_name
            )
        })
    }
}
