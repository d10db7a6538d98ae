//! OpenWeatherMap current-weather client.

use crate::types::{Coordinates, Query, WeatherError, WeatherResult};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";
const SUCCESS_CODE: i64 = 200;

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
}

impl WeatherProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch current conditions for a city name or coordinate pair.
    ///
    /// The provider's JSON body decides the outcome, not the HTTP status:
    /// error bodies arrive with 4xx statuses and carry the message to show.
    pub async fn fetch(&self, query: &Query) -> Result<WeatherResult, WeatherError> {
        let url = format!("{}{}", self.base_url, CURRENT_WEATHER_PATH);

        let mut params: Vec<(&str, String)> = match query {
            Query::City(name) => vec![("q", name.clone())],
            Query::Coordinates(c) => vec![
                ("lat", c.latitude.to_string()),
                ("lon", c.longitude.to_string()),
            ],
        };
        params.push(("appid", self.api_key.clone()));
        params.push(("units", "metric".to_string()));

        tracing::debug!(%query, "Requesting current weather");

        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: CurrentWeatherResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::Parse(format!("{} (HTTP {})", e, status)))?;

        let result = parsed.into_result();
        match &result {
            Ok(weather) => tracing::info!(
                "Weather for {}: {}, {}°C",
                query,
                weather.name,
                weather.temperature
            ),
            Err(e) => tracing::warn!("Weather lookup for {} failed: {}", query, e),
        }
        result
    }
}

/// `cod` is an integer on success and a string on most errors
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseCode {
    Number(i64),
    Text(String),
}

impl ResponseCode {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    cod: Option<ResponseCode>,
    message: Option<serde_json::Value>,
    name: Option<String>,
    sys: Option<SysSection>,
    coord: Option<CoordSection>,
    #[serde(default)]
    weather: Vec<ConditionEntry>,
    main: Option<MainSection>,
    wind: Option<WindSection>,
}

#[derive(Debug, Deserialize)]
struct SysSection {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoordSection {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct WindSection {
    speed: f64,
}

fn missing(field: &str) -> WeatherError {
    WeatherError::Parse(format!("missing field `{}`", field))
}

impl CurrentWeatherResponse {
    fn into_result(self) -> Result<WeatherResult, WeatherError> {
        let code = self
            .cod
            .as_ref()
            .and_then(ResponseCode::as_i64)
            .ok_or_else(|| missing("cod"))?;

        if code != SUCCESS_CODE {
            let message = match self.message {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            return Err(WeatherError::Provider { code, message });
        }

        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| missing("weather[0]"))?;
        let coord = self.coord.ok_or_else(|| missing("coord"))?;
        let main = self.main.ok_or_else(|| missing("main"))?;
        let wind = self.wind.ok_or_else(|| missing("wind"))?;

        Ok(WeatherResult {
            name: self.name.ok_or_else(|| missing("name"))?,
            country: self.sys.and_then(|s| s.country).unwrap_or_default(),
            temperature: main.temp,
            humidity: main.humidity,
            wind_speed: wind.speed,
            condition: condition.main,
            description: condition.description,
            icon: condition.icon,
            coordinates: Coordinates::new(coord.lat, coord.lon),
        })
    }
}
