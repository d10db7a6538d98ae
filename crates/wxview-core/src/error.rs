//! Centralized error types for wxview.
//!
//! This module provides a typed error hierarchy that:
//! - Separates startup failures (config, terminal) from lookup failures
//! - Provides user-friendly messages suitable for the terminal
//! - Preserves full error context for logging

use thiserror::Error;

/// Top-level application error type.
///
/// Lookup failures never reach this type; they are rendered in the view.
/// Use `user_message()` to get a message fit for stderr.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Recovers a typed error from an `anyhow` chain where one is present.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<ConfigError>() {
            Ok(cfg) => AppError::Config(cfg),
            Err(err) => match err.downcast::<std::io::Error>() {
                Ok(io) => AppError::Io(io),
                Err(err) => AppError::Other(err),
            },
        }
    }

    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A terminal or file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => {
                "An API credential is missing. Set it in config.toml or the environment."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let cfg_err = ConfigError::MissingSetting("weather.api_key".into());
        let app_err: AppError = cfg_err.into();
        assert!(matches!(app_err, AppError::Config(ConfigError::MissingSetting(_))));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Config(ConfigError::ParseError("bad toml".into()));
        assert_eq!(
            app_err.user_message(),
            "Configuration file is malformed. Check your settings."
        );
    }

    #[test]
    fn test_from_anyhow_recovers_config_error() {
        let err = anyhow::Error::new(ConfigError::Invalid("location.latitude".into()));
        assert!(matches!(
            AppError::from_anyhow(err),
            AppError::Config(ConfigError::Invalid(_))
        ));

        let other = anyhow::anyhow!("boom");
        assert!(matches!(AppError::from_anyhow(other), AppError::Other(_)));
    }

    #[test]
    fn test_display_keeps_detail() {
        let err = ConfigError::MissingSetting("air_quality.token".into());
        assert!(err.to_string().contains("air_quality.token"));
    }
}
