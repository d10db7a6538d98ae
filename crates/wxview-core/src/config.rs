use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable overriding `weather.api_key`
pub const WEATHER_API_KEY_ENV: &str = "OPENWEATHER_API_KEY";
/// Environment variable overriding `air_quality.token`
pub const AIR_QUALITY_TOKEN_ENV: &str = "AQICN_TOKEN";

const APP_DIR_NAME: &str = "wxview";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Credentials for the two upstream providers.
///
/// Passed explicitly into the clients at construction; nothing below the
/// binary reads the process environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub weather_api_key: String,
    pub air_quality_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("weather_api_key", &"<redacted>")
            .field("air_quality_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Air-quality provider settings
    #[serde(default)]
    pub air_quality: AirQualityConfig,

    /// Startup location settings
    #[serde(default)]
    pub location: LocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key (can be set via OPENWEATHER_API_KEY)
    pub api_key: Option<String>,

    /// Base URL of the current-weather API
    pub base_url: String,

    /// City looked up when no device position is available
    pub default_city: String,

    /// Per-request timeout for both providers
    pub request_timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org".to_string(),
            default_city: "London".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AirQualityConfig {
    /// aqicn.org token (can be set via AQICN_TOKEN)
    pub token: Option<String>,

    /// Base URL of the WAQI feed API
    pub base_url: String,
}

impl Default for AirQualityConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: "https://api.waqi.info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Ask the platform location service for a position at startup
    pub use_device_location: bool,

    /// Fixed position, used instead of the platform service when both are set
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// How long to wait for the platform service to report a fix
    pub timeout_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            use_device_location: true,
            latitude: None,
            longitude: None,
            timeout_secs: 10,
        }
    }
}

impl LocationConfig {
    /// Configured fixed position, if both halves are present
    pub fn fixed_position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing.
    /// Credentials from the environment take precedence over the file.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors; warnings
    /// are logged.
    pub fn load_validated() -> Result<Self> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Overlay credentials from a key lookup (the process environment in
    /// production). Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(WEATHER_API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.weather.api_key = Some(key);
        }
        if let Some(token) = lookup(AIR_QUALITY_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.air_quality.token = Some(token);
        }
    }

    /// Both provider credentials, or the first one missing
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let weather_api_key = non_empty(self.weather.api_key.as_deref()).ok_or_else(|| {
            ConfigError::MissingSetting(format!("weather.api_key (or {})", WEATHER_API_KEY_ENV))
        })?;
        let air_quality_token = non_empty(self.air_quality.token.as_deref()).ok_or_else(|| {
            ConfigError::MissingSetting(format!("air_quality.token (or {})", AIR_QUALITY_TOKEN_ENV))
        })?;

        Ok(Credentials {
            weather_api_key: weather_api_key.to_string(),
            air_quality_token: air_quality_token.to_string(),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        validate_url(&self.air_quality.base_url, "air_quality.base_url", &mut result);

        if self.weather.default_city.trim().is_empty() {
            result.add_error("weather.default_city", "Default city cannot be empty");
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 120 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        let loc = &self.location;
        match (loc.latitude, loc.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    result.add_error("location.latitude", "Latitude must be within -90..=90");
                }
                if !(-180.0..=180.0).contains(&lon) {
                    result.add_error("location.longitude", "Longitude must be within -180..=180");
                }
            }
            (None, None) => {}
            _ => result.add_error(
                "location",
                "latitude and longitude must be set together",
            ),
        }

        if loc.use_device_location && loc.timeout_secs == 0 {
            result.add_warning(
                "location.timeout_secs",
                "Device location timeout is 0; the default city will always be used",
            );
        }

        if self.weather.api_key.is_none() {
            result.add_warning("weather.api_key", "Not set in config file");
        }
        if self.air_quality.token.is_none() {
            result.add_warning("air_quality.token", "Not set in config file");
        }

        result
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Directory holding the config file and the log file
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR_NAME))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_missing_credentials_are_warnings() {
        let result = Config::default().validate();
        assert!(result.warnings.iter().any(|w| w.field == "weather.api_key"));
        assert!(result.warnings.iter().any(|w| w.field == "air_quality.token"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.base_url = "ftp://api.openweathermap.org".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.air_quality.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "air_quality.base_url"));
    }

    #[test]
    fn test_half_fixed_position_is_error() {
        let mut config = Config::default();
        config.location.latitude = Some(51.5);
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(config.location.fixed_position().is_none());
    }

    #[test]
    fn test_out_of_range_latitude() {
        let mut config = Config::default();
        config.location.latitude = Some(91.0);
        config.location.longitude = Some(0.0);
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "location.latitude"));
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let mut config = Config::default();
        config.weather.request_timeout_secs = 0;
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_credentials_missing() {
        let mut config = Config::default();
        config.weather.api_key = Some("key".into());
        let err = config.credentials().unwrap_err();
        assert!(err.to_string().contains("air_quality.token"));
    }

    #[test]
    fn test_overrides_take_precedence_and_skip_empty() {
        let mut config = Config::default();
        config.weather.api_key = Some("from-file".into());
        config.air_quality.token = Some("file-token".into());

        config.apply_overrides(|key| match key {
            WEATHER_API_KEY_ENV => Some("from-env".to_string()),
            AIR_QUALITY_TOKEN_ENV => Some("   ".to_string()),
            _ => None,
        });

        let creds = config.credentials().unwrap();
        assert_eq!(creds.weather_api_key, "from-env");
        assert_eq!(creds.air_quality_token, "file-token");
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials {
            weather_api_key: "secret-key".into(),
            air_quality_token: "secret-token".into(),
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("secret"));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.weather.default_city, "London");
    }

    #[test]
    fn test_load_from_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather]\napi_key = \"abc\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weather.api_key.as_deref(), Some("abc"));
        assert_eq!(config.weather.base_url, "https://api.openweathermap.org");
        assert_eq!(config.air_quality.base_url, "https://api.waqi.info");
        assert!(config.location.use_device_location);
    }

    #[test]
    fn test_load_from_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
