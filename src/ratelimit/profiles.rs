//! Named limiter profiles and their configuration.
//!
//! A deployment usually runs several limiters side by side, each tuned for
//! one concern. This module names those concerns and loads their quotas from
//! YAML, falling back to the stock values for anything left out.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use super::limiter::RateLimiterConfig;
use crate::error::{Result, WindowgateError};

/// A limiter concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// General API calls
    Api,
    /// Authentication attempts
    Auth,
    /// Search queries
    Search,
    /// File uploads
    Upload,
}

impl Profile {
    /// Every profile, in display order.
    pub const ALL: [Profile; 4] = [Profile::Api, Profile::Auth, Profile::Search, Profile::Upload];

    /// Stock quota for this profile.
    pub const fn defaults(&self) -> RateLimiterConfig {
        match self {
            Profile::Api => RateLimiterConfig::new(100, 60_000),
            Profile::Auth => RateLimiterConfig::new(5, 900_000),
            Profile::Search => RateLimiterConfig::new(30, 60_000),
            Profile::Upload => RateLimiterConfig::new(10, 60_000),
        }
    }

    /// Lowercase name used in configuration and on the command line.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Profile::Api => "api",
            Profile::Auth => "auth",
            Profile::Search => "search",
            Profile::Upload => "upload",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = WindowgateError;

    fn from_str(s: &str) -> Result<Self> {
        Profile::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                WindowgateError::Config(format!(
                    "unknown profile '{}', expected one of: api, auth, search, upload",
                    s
                ))
            })
    }
}

/// Quotas for every profile.
///
/// Any profile, or any field of a profile, left out of the source keeps its
/// stock value from [`Profile::defaults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PartialProfiles")]
pub struct ProfilesConfig {
    /// General API limiter
    pub api: RateLimiterConfig,

    /// Authentication attempt limiter
    pub auth: RateLimiterConfig,

    /// Search limiter
    pub search: RateLimiterConfig,

    /// Upload limiter
    pub upload: RateLimiterConfig,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            api: Profile::Api.defaults(),
            auth: Profile::Auth.defaults(),
            search: Profile::Search.defaults(),
            upload: Profile::Upload.defaults(),
        }
    }
}

/// A profile as written in configuration, possibly incomplete.
#[derive(Debug, Default, Deserialize)]
struct PartialLimit {
    max_requests: Option<u32>,
    window_ms: Option<u64>,
}

impl PartialLimit {
    fn merge_over(self, defaults: RateLimiterConfig) -> RateLimiterConfig {
        RateLimiterConfig {
            max_requests: self.max_requests.unwrap_or(defaults.max_requests),
            window_ms: self.window_ms.unwrap_or(defaults.window_ms),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialProfiles {
    #[serde(default)]
    api: PartialLimit,
    #[serde(default)]
    auth: PartialLimit,
    #[serde(default)]
    search: PartialLimit,
    #[serde(default)]
    upload: PartialLimit,
}

impl From<PartialProfiles> for ProfilesConfig {
    fn from(partial: PartialProfiles) -> Self {
        Self {
            api: partial.api.merge_over(Profile::Api.defaults()),
            auth: partial.auth.merge_over(Profile::Auth.defaults()),
            search: partial.search.merge_over(Profile::Search.defaults()),
            upload: partial.upload.merge_over(Profile::Upload.defaults()),
        }
    }
}

impl ProfilesConfig {
    /// Load profiles from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading limiter profiles");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load profiles from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ProfilesConfig = serde_yaml::from_str(yaml).map_err(|e| {
            WindowgateError::Config(format!("Failed to parse limiter profiles: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Quota for one profile.
    pub fn get(&self, profile: Profile) -> RateLimiterConfig {
        match profile {
            Profile::Api => self.api,
            Profile::Auth => self.auth,
            Profile::Search => self.search,
            Profile::Upload => self.upload,
        }
    }

    /// Reject zero quotas and zero-length windows.
    pub fn validate(&self) -> Result<()> {
        for profile in Profile::ALL {
            let config = self.get(profile);
            if config.max_requests == 0 {
                return Err(WindowgateError::Config(format!(
                    "profile '{}': max_requests must be positive",
                    profile
                )));
            }
            if config.window_ms == 0 {
                return Err(WindowgateError::Config(format!(
                    "profile '{}': window_ms must be positive",
                    profile
                )));
            }
        }
        Ok(())
    }
}
