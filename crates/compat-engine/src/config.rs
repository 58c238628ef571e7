//! Engine Configuration

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use compat_env::SupportPolicy;
use compat_features::DEFAULT_DECODE_TIMEOUT;
use compat_polyfill::{ObserverConfig, RootMargin};
use compat_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};

/// Deployment environment, selects config presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Compatibility engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub environment: Environment,

    /// Minimum versions and bot handling
    pub support: SupportPolicy,

    /// Upper bound on each image decode probe
    #[serde(with = "compat_env::millis")]
    pub decode_timeout: Duration,

    /// Visibility fallback options
    pub observer: ObserverConfig,

    pub telemetry: TelemetryConfig,

    /// Default log filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::development()
    }
}

impl Config {
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            support: SupportPolicy::default(),
            decode_timeout: DEFAULT_DECODE_TIMEOUT,
            observer: ObserverConfig::default(),
            telemetry: TelemetryConfig::development(),
            log_filter: "compat=debug,warn".to_string(),
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            telemetry: TelemetryConfig::production(),
            log_filter: "compat=info,warn".to_string(),
            ..Self::development()
        }
    }

    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
        }
    }

    /// Parse and validate a JSON config; missing fields take defaults
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse compat config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        RootMargin::parse(&self.observer.root_margin).context("Invalid observer root margin")?;
        self.telemetry.validate().context("Invalid telemetry config")?;
        anyhow::ensure!(!self.decode_timeout.is_zero(), "Decode timeout must be non-zero");
        Ok(())
    }
}
