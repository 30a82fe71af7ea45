//! Configuration error types.

use thiserror::Error;

/// A repulsion setting outside its valid range.
#[derive(Debug, Error, PartialEq)]
#[error("{field} must be {expected}, got {value}")]
pub struct ConfigError {
    pub field: &'static str,
    pub expected: &'static str,
    pub value: f64,
}

impl ConfigError {
    #[must_use]
    pub const fn new(field: &'static str, expected: &'static str, value: f64) -> Self {
        Self {
            field,
            expected,
            value,
        }
    }
}

/// Result type for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;
