use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Banner text for weather failures that carry no provider message
pub const GENERIC_WEATHER_ERROR: &str = "Failed to fetch weather.";

/// Pollutant code for fine particulate matter
pub const PM25: &str = "pm25";
/// Pollutant code for coarse particulate matter
pub const PM10: &str = "pm10";

/// Geographic coordinate pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// What a single lookup asks the weather provider for
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    City(String),
    Coordinates(Coordinates),
}

impl Query {
    /// A city query from free text. Blank input yields `None`.
    pub fn city(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            None
        } else {
            Some(Self::City(name.to_string()))
        }
    }

    pub fn is_coordinates(&self) -> bool {
        matches!(self, Self::Coordinates(_))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::City(name) => write!(f, "{}", name),
            Self::Coordinates(c) => write!(f, "({})", c),
        }
    }
}

/// Weather condition categories mapped from OpenWeatherMap icon codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    Snow,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an icon identifier such as `"10d"` to a condition.
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_icon(icon: &str) -> Self {
        match icon.get(..2) {
            Some("01") => Self::Clear,
            Some("02") => Self::PartlyCloudy,
            Some("03") | Some("04") => Self::Cloudy,
            Some("09") => Self::Drizzle,
            Some("10") => Self::Rain,
            Some("11") => Self::Thunderstorm,
            Some("13") => Self::Snow,
            Some("50") => Self::Fog,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    /// Glyph shown in place of the provider icon
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Clear => "☀",
            Self::PartlyCloudy => "⛅",
            Self::Cloudy => "☁",
            Self::Fog => "≡",
            Self::Drizzle => "☂",
            Self::Rain => "☔",
            Self::Snow => "❄",
            Self::Thunderstorm => "⚡",
        }
    }
}

/// Current conditions for one place, as reported by the weather provider
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherResult {
    pub name: String,
    pub country: String,
    /// Degrees Celsius
    pub temperature: f64,
    /// Percent
    pub humidity: f64,
    /// Metres per second
    pub wind_speed: f64,
    /// Short condition text, e.g. "Clear"
    pub condition: String,
    /// Longer condition text, e.g. "clear sky"
    pub description: String,
    /// Icon identifier, e.g. "01d"
    pub icon: String,
    /// Position the provider resolved the query to
    pub coordinates: Coordinates,
}

impl WeatherResult {
    pub fn rounded_temperature(&self) -> i64 {
        round_half_up(self.temperature)
    }

    pub fn rounded_wind_speed(&self) -> i64 {
        round_half_up(self.wind_speed)
    }

    pub fn condition_kind(&self) -> WeatherCondition {
        WeatherCondition::from_icon(&self.icon)
    }

    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}@2x.png", self.icon)
    }

    pub fn is_daytime(&self) -> bool {
        !self.icon.ends_with('n')
    }
}

/// Air quality near a coordinate pair
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AirQualityResult {
    /// Overall index; `None` when the station reports no current value
    pub aqi: Option<f64>,
    /// Pollutant code -> measured value
    pub pollutants: BTreeMap<String, f64>,
}

impl AirQualityResult {
    pub fn pollutant(&self, code: &str) -> Option<f64> {
        self.pollutants.get(code).copied()
    }

    pub fn pm25(&self) -> Option<f64> {
        self.pollutant(PM25)
    }

    pub fn pm10(&self) -> Option<f64> {
        self.pollutant(PM10)
    }
}

/// Round half toward positive infinity, so 2.5 -> 3 and -2.5 -> -2.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Provider error {code}: {message}")]
    Provider { code: i64, message: String },
}

impl WeatherError {
    /// Text for the error banner: the provider's own message when it sent
    /// one, otherwise the generic failure text.
    pub fn banner_message(&self) -> String {
        match self {
            Self::Provider { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => GENERIC_WEATHER_ERROR.to_string(),
        }
    }
}
