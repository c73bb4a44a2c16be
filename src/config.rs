//! Configuration management for Windowgate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::ratelimit::ProfilesConfig;

/// Prefix for environment overrides, e.g. `WINDOWGATE__LIMITS__AUTH__MAX_REQUESTS`.
pub const ENV_PREFIX: &str = "WINDOWGATE";

/// Main configuration for Windowgate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowgateConfig {
    /// Limiter quotas per profile
    #[serde(default)]
    pub limits: ProfilesConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl WindowgateConfig {
    /// Load configuration from a file, then apply environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(Some(path.as_ref()), ENV_PREFIX)
    }

    /// Load configuration from defaults and environment overrides only.
    pub fn from_env() -> Result<Self> {
        Self::load(None, ENV_PREFIX)
    }

    fn load(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: WindowgateConfig = builder
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.limits.validate()?;
        Ok(config)
    }
}
