//! WAQI (aqicn.org) geo-feed client.
//!
//! Failures here never reach the user: `fetch` collapses every error into
//! `None` and the air-quality panel is simply left out.

use crate::types::{AirQualityResult, Coordinates};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Why an air-quality lookup produced no data
#[derive(Debug, thiserror::Error)]
pub enum AirQualityError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Provider status {status:?}: {detail}")]
    Status { status: String, detail: String },
}

#[derive(Debug, Clone)]
pub struct AirQualityProvider {
    client: Arc<Client>,
    token: String,
    base_url: String,
}

impl AirQualityProvider {
    pub fn new(
        token: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            token: token.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Air quality near `coords`, or `None` on any failure.
    pub async fn fetch(&self, coords: Coordinates) -> Option<AirQualityResult> {
        match self.try_fetch(coords).await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::debug!("No air-quality data for {}: {}", coords, e);
                None
            }
        }
    }

    /// Same request as [`fetch`](Self::fetch), keeping the failure reason.
    pub async fn try_fetch(&self, coords: Coordinates) -> Result<AirQualityResult, AirQualityError> {
        let url = format!(
            "{}/feed/geo:{};{}/",
            self.base_url, coords.latitude, coords.longitude
        );

        tracing::debug!(%coords, "Requesting air quality");

        let response = self
            .client
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await?;
        let body = response.text().await?;

        let parsed: FeedResponse =
            serde_json::from_str(&body).map_err(|e| AirQualityError::Parse(e.to_string()))?;

        parsed.into_result()
    }
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    status: String,
    /// An object on success, an error string otherwise
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    aqi: Option<serde_json::Value>,
    #[serde(default)]
    iaqi: BTreeMap<String, Measurement>,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    v: Option<serde_json::Value>,
}

/// Numbers pass through; numeric strings are parsed; anything else (WAQI
/// sends `"-"` for stations without a reading) is no value.
fn numeric(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl FeedResponse {
    fn into_result(self) -> Result<AirQualityResult, AirQualityError> {
        if self.status != "ok" {
            let detail = match self.data {
                Some(serde_json::Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => String::new(),
            };
            return Err(AirQualityError::Status {
                status: self.status,
                detail,
            });
        }

        let data = self
            .data
            .ok_or_else(|| AirQualityError::Parse("missing field `data`".into()))?;
        let data: FeedData =
            serde_json::from_value(data).map_err(|e| AirQualityError::Parse(e.to_string()))?;

        let pollutants = data
            .iaqi
            .into_iter()
            .filter_map(|(code, m)| m.v.as_ref().and_then(numeric).map(|v| (code, v)))
            .collect();

        Ok(AirQualityResult {
            aqi: data.aqi.as_ref().and_then(numeric),
            pollutants,
        })
    }
}
