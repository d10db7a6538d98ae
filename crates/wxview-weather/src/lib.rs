//! Weather lookups for wxview
//!
//! Current conditions from OpenWeatherMap, air quality from WAQI, and the
//! sequencing that ties the two together into one view state.

pub mod air_quality;
pub mod location;
pub mod lookup;
pub mod provider;
pub mod types;

pub use air_quality::{AirQualityError, AirQualityProvider};
pub use location::{
    resolve_initial_query, FixedLocation, LocationSource, NoLocation, SystemLocation,
};
pub use lookup::{Lookup, LookupEvent, LookupId, ViewState};
pub use provider::WeatherProvider;
pub use types::*;
