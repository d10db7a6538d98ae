//! Lookup sequencing: weather first, then air quality for the same place.
//!
//! Every lookup gets a [`LookupId`] from a monotonically increasing counter.
//! [`ViewState`] remembers the newest id it started and drops events from
//! any other, so an older lookup that finishes late cannot overwrite a newer
//! one. Lookups are never cancelled; their results are simply ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::air_quality::AirQualityProvider;
use crate::provider::WeatherProvider;
use crate::types::{AirQualityResult, Query, WeatherError, WeatherResult};
use wxview_core::{Config, Credentials};

/// Sequence number of one lookup cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LookupId(u64);

impl LookupId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Progress of a lookup, in the order a lookup emits them
#[derive(Debug)]
pub enum LookupEvent {
    Weather {
        id: LookupId,
        query: Query,
        result: Result<WeatherResult, WeatherError>,
    },
    /// Only emitted after a successful `Weather` event with the same id
    AirQuality {
        id: LookupId,
        result: Option<AirQualityResult>,
    },
}

impl LookupEvent {
    pub fn id(&self) -> LookupId {
        match self {
            Self::Weather { id, .. } | Self::AirQuality { id, .. } => *id,
        }
    }
}

/// Everything the presentation layer draws from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Text of the search field
    pub query_text: String,
    pub weather: Option<WeatherResult>,
    pub air_quality: Option<AirQualityResult>,
    pub loading: bool,
    pub error: Option<String>,
    /// Newest lookup started; events from any other id are stale
    latest: Option<LookupId>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<LookupId> {
        self.latest
    }

    /// Enter the loading state for lookup `id`, clearing the previous result.
    pub fn begin(&mut self, id: LookupId) {
        if self.latest.is_some_and(|latest| id < latest) {
            tracing::debug!(lookup = id.value(), "Ignoring begin for superseded lookup");
            return;
        }
        self.latest = Some(id);
        self.loading = true;
        self.error = None;
        self.weather = None;
        self.air_quality = None;
    }

    /// Apply a lookup event. Returns false when the event was stale and
    /// discarded.
    pub fn apply(&mut self, event: LookupEvent) -> bool {
        if self.latest != Some(event.id()) {
            tracing::debug!(lookup = event.id().value(), "Discarding stale lookup result");
            return false;
        }

        match event {
            LookupEvent::Weather { query, result, .. } => {
                self.loading = false;
                match result {
                    Ok(weather) => {
                        if query.is_coordinates() {
                            self.query_text = weather.name.clone();
                        }
                        self.error = None;
                        self.weather = Some(weather);
                    }
                    Err(e) => {
                        self.error = Some(e.banner_message());
                        self.weather = None;
                        self.air_quality = None;
                    }
                }
                true
            }
            LookupEvent::AirQuality { result, .. } => {
                // No weather card, no air-quality panel
                if self.weather.is_none() {
                    return false;
                }
                self.air_quality = result;
                true
            }
        }
    }
}

/// Runs lookups against both providers.
#[derive(Debug)]
pub struct Lookup {
    weather: WeatherProvider,
    air_quality: AirQualityProvider,
    next_id: AtomicU64,
}

impl Lookup {
    pub fn new(weather: WeatherProvider, air_quality: AirQualityProvider) -> Self {
        Self {
            weather,
            air_quality,
            next_id: AtomicU64::new(1),
        }
    }

    /// Build both clients from configuration and explicit credentials.
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self, WeatherError> {
        let timeout = Duration::from_secs(config.weather.request_timeout_secs);
        let weather = WeatherProvider::new(
            credentials.weather_api_key.as_str(),
            &config.weather.base_url,
            timeout,
        )?;
        let air_quality = AirQualityProvider::new(
            credentials.air_quality_token.as_str(),
            &config.air_quality.base_url,
            timeout,
        )?;
        Ok(Self::new(weather, air_quality))
    }

    /// Issue the next sequence number. Ids are strictly increasing.
    pub fn next_id(&self) -> LookupId {
        LookupId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Run one lookup to completion, reporting each step through `emit`.
    ///
    /// The air-quality step starts only after the weather step succeeds and
    /// uses the coordinates the weather provider resolved.
    pub async fn run<F>(&self, id: LookupId, query: Query, mut emit: F)
    where
        F: FnMut(LookupEvent),
    {
        tracing::info!(lookup = id.value(), %query, "Starting lookup");

        let result = self.weather.fetch(&query).await;
        let coords = result.as_ref().ok().map(|w| w.coordinates);

        emit(LookupEvent::Weather { id, query, result });

        let Some(coords) = coords else {
            return;
        };

        let result = self.air_quality.fetch(coords).await;
        emit(LookupEvent::AirQuality { id, result });
    }

    /// Spawn `run` on the current runtime, sending events to `tx`.
    pub fn spawn(
        self: &Arc<Self>,
        id: LookupId,
        query: Query,
        tx: mpsc::UnboundedSender<LookupEvent>,
    ) -> JoinHandle<()> {
        let lookup = Arc::clone(self);
        tokio::spawn(async move {
            lookup
                .run(id, query, |event| {
                    if tx.send(event).is_err() {
                        tracing::debug!(lookup = id.value(), "View closed; dropping lookup event");
                    }
                })
                .await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinates;

    fn weather(name: &str) -> WeatherResult {
        WeatherResult {
            name: name.into(),
            country: "GB".into(),
            temperature: 15.4,
            humidity: 60.0,
            wind_speed: 3.2,
            condition: "Clear".into(),
            description: "clear sky".into(),
            icon: "01d".into(),
            coordinates: Coordinates::new(51.5, -0.1),
        }
    }

    fn weather_ok(id: LookupId, query: Query, name: &str) -> LookupEvent {
        LookupEvent::Weather {
            id,
            query,
            result: Ok(weather(name)),
        }
    }

    fn aq(id: LookupId) -> LookupEvent {
        LookupEvent::AirQuality {
            id,
            result: Some(AirQualityResult {
                aqi: Some(42.0),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = ViewState::new();
        assert!(state.query_text.is_empty());
        assert!(state.weather.is_none());
        assert!(state.air_quality.is_none());
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert!(state.latest().is_none());
    }

    #[test]
    fn test_begin_clears_previous_results_together() {
        let mut state = ViewState::new();
        state.begin(LookupId(1));
        assert!(state.apply(weather_ok(LookupId(1), Query::City("London".into()), "London")));
        assert!(state.apply(aq(LookupId(1))));

        state.begin(LookupId(2));
        assert!(state.loading);
        assert!(state.weather.is_none());
        assert!(state.air_quality.is_none());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_success_stops_loading() {
        let mut state = ViewState::new();
        state.begin(LookupId(1));
        state.apply(weather_ok(LookupId(1), Query::City("London".into()), "London"));
        assert!(!state.loading);
        assert_eq!(state.weather.as_ref().map(|w| w.name.as_str()), Some("London"));
    }

    #[test]
    fn test_coordinate_lookup_backfills_query_text() {
        let mut state = ViewState::new();
        state.begin(LookupId(1));
        let query = Query::Coordinates(Coordinates::new(51.5, -0.1));
        state.apply(weather_ok(LookupId(1), query, "London"));
        assert_eq!(state.query_text, "London");
    }

    #[test]
    fn test_city_lookup_keeps_query_text() {
        let mut state = ViewState::new();
        state.query_text = "london".into();
        state.begin(LookupId(1));
        state.apply(weather_ok(LookupId(1), Query::City("london".into()), "London"));
        assert_eq!(state.query_text, "london");
    }

    #[test]
    fn test_weather_failure_clears_everything() {
        let mut state = ViewState::new();
        state.begin(LookupId(1));
        state.apply(LookupEvent::Weather {
            id: LookupId(1),
            query: Query::City("Atlantis".into()),
            result: Err(WeatherError::Provider {
                code: 404,
                message: "city not found".into(),
            }),
        });

        assert!(!state.loading);
        assert!(state.weather.is_none());
        assert!(state.air_quality.is_none());
        assert_eq!(state.error.as_deref(), Some("city not found"));
    }

    #[test]
    fn test_air_quality_needs_weather() {
        let mut state = ViewState::new();
        state.begin(LookupId(1));
        assert!(!state.apply(aq(LookupId(1))));
        assert!(state.air_quality.is_none());
    }

    #[test]
    fn test_air_quality_none_leaves_panel_empty() {
        let mut state = ViewState::new();
        state.begin(LookupId(1));
        state.apply(weather_ok(LookupId(1), Query::City("London".into()), "London"));
        state.apply(LookupEvent::AirQuality {
            id: LookupId(1),
            result: None,
        });
        assert!(state.weather.is_some());
        assert!(state.air_quality.is_none());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let mut state = ViewState::new();
        state.begin(LookupId(1));
        state.begin(LookupId(2));

        // The newer lookup finishes first
        assert!(state.apply(weather_ok(LookupId(2), Query::City("Paris".into()), "Paris")));
        // The older one lands afterwards and must not win
        assert!(!state.apply(weather_ok(LookupId(1), Query::City("London".into()), "London")));
        assert!(!state.apply(aq(LookupId(1))));

        assert_eq!(state.weather.as_ref().map(|w| w.name.as_str()), Some("Paris"));
        assert!(state.air_quality.is_none());
    }

    #[test]
    fn test_stale_failure_does_not_clear_newer_result() {
        let mut state = ViewState::new();
        state.begin(LookupId(1));
        state.begin(LookupId(2));
        state.apply(weather_ok(LookupId(2), Query::City("Paris".into()), "Paris"));

        let applied = state.apply(LookupEvent::Weather {
            id: LookupId(1),
            query: Query::City("Atlantis".into()),
            result: Err(WeatherError::Parse("bad".into())),
        });

        assert!(!applied);
        assert!(state.error.is_none());
        assert!(state.weather.is_some());
    }

    #[test]
    fn test_begin_ignores_older_id() {
        let mut state = ViewState::new();
        state.begin(LookupId(5));
        state.begin(LookupId(3));
        assert_eq!(state.latest(), Some(LookupId(5)));
    }

    #[test]
    fn test_ids_increase() {
        let credentials = Credentials {
            weather_api_key: "k".into(),
            air_quality_token: "t".into(),
        };
        let lookup = Lookup::from_config(&Config::default(), &credentials).unwrap();
        let a = lookup.next_id();
        let b = lookup.next_id();
        assert!(b > a);
    }
}
