use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use wxview_core::{AppError, Config};
use wxview_weather::{
    Coordinates, FixedLocation, LocationSource, Lookup, NoLocation, SystemLocation,
};

const LOG_FILE_NAME: &str = "wxview.log";

fn location_source(config: &Config) -> Box<dyn LocationSource> {
    let loc = &config.location;
    if let Some((lat, lon)) = loc.fixed_position() {
        Box::new(FixedLocation(Coordinates::new(lat, lon)))
    } else if loc.use_device_location {
        Box::new(SystemLocation::new(Duration::from_secs(loc.timeout_secs)))
    } else {
        Box::new(NoLocation)
    }
}

async fn run() -> Result<()> {
    let log_file = Config::config_dir()?.join(LOG_FILE_NAME);
    wxview_core::init(Some(&log_file))?;

    let config = Config::load_validated()?;
    let credentials = config.credentials()?;

    let lookup = Arc::new(Lookup::from_config(&config, &credentials)?);
    let location = location_source(&config);

    tracing::info!("wxview started");
    wxview_ui::run(lookup, location, config.weather.default_city.clone()).await?;
    tracing::info!("wxview exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Fatal: {:#}", e);
            let app_err = AppError::from_anyhow(e);
            eprintln!("wxview: {}", app_err.user_message());
            eprintln!("  {}", app_err);
            ExitCode::FAILURE
        }
    }
}
