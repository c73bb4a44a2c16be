//! Error types for Windowgate.

use thiserror::Error;

/// Main error type for Windowgate operations.
#[derive(Error, Debug)]
pub enum WindowgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Quota exhausted for a key in its current window
    #[error("Rate limit exceeded. Please try again in {retry_after_secs} seconds.")]
    RateLimited {
        /// The throttled key
        key: String,
        /// Whole seconds until the window resets, rounded up
        retry_after_secs: u64,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WindowgateError {
    /// Returns the wait time if this error is a rate limit rejection.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            WindowgateError::RateLimited { retry_after_secs, .. } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for WindowgateError {
    fn from(err: config::ConfigError) -> Self {
        WindowgateError::Config(err.to_string())
    }
}

/// Result type alias for Windowgate operations.
pub type Result<T> = std::result::Result<T, WindowgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_message() {
        let err = WindowgateError::RateLimited {
            key: "user1".to_string(),
            retry_after_secs: 42,
        };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Please try again in 42 seconds."
        );
        assert_eq!(err.retry_after_secs(), Some(42));
    }

    #[test]
    fn test_config_error_has_no_retry() {
        let err = WindowgateError::Config("bad".to_string());
        assert_eq!(err.retry_after_secs(), None);
    }
}
