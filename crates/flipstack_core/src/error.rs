//! Configuration error types

use thiserror::Error;

/// Errors raised while loading or validating navigation configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML document could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of its valid range
    #[error("Invalid config value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Reject values that are not finite and strictly positive
pub fn ensure_positive(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be finite and > 0, got {value}"),
        ))
    }
}

/// Reject values outside `[min, max]`
pub fn ensure_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be within [{min}, {max}], got {value}"),
        ))
    }
}
