//! config.rs - YAML configuration for `HttpLogger`.
//!
//! ```yaml
//! url: https://collector.example.com/message
//! rules: |
//!   include standard
//!   sample 50
//! enabled: true
//! max_in_flight: 64
//! ```
//!
//! License: MIT OR APACHE 2.0

use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::delivery::DeliveryTarget;
use crate::logger::LoggerOptions;

/// Logger settings read from a YAML file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    pub url: Option<String>,
    pub rules: Option<String>,
    pub enabled: Option<bool>,
    pub max_in_flight: Option<usize>,
    pub agent: Option<String>,
    pub host: Option<String>,
}

impl LoggerConfig {
    /// Loads a configuration from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading logger config from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: LoggerConfig = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if config.max_in_flight == Some(0) {
            bail!("max_in_flight must be at least 1 in {}", path.display());
        }
        Ok(config)
    }

    /// Converts into logger options. A configured `url` becomes the target;
    /// otherwise the default URL is used.
    pub fn into_options(self) -> LoggerOptions {
        let defaults = LoggerOptions::default();
        LoggerOptions {
            target: self.url.map_or(DeliveryTarget::Default, DeliveryTarget::Url),
            rules: self.rules,
            enabled: self.enabled.unwrap_or(defaults.enabled),
            max_in_flight: self.max_in_flight.unwrap_or(defaults.max_in_flight),
            agent: self.agent.unwrap_or(defaults.agent),
            host: self.host.unwrap_or(defaults.host),
            ..defaults
        }
    }
}
