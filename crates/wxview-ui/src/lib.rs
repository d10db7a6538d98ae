//! Terminal presentation for wxview.
//!
//! Lookups and the startup location run on background tasks; their results
//! come back over channels and are applied on the UI loop, which is the only
//! place the view state is mutated.

pub mod app;
pub mod handler;
pub mod tui;
pub mod ui;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use wxview_weather::{resolve_initial_query, LocationSource, Lookup, LookupEvent};

pub use app::App;

/// Run the terminal UI until the user quits.
///
/// The first lookup uses the device position from `location`, or
/// `default_city` if the position is unavailable.
pub async fn run(
    lookup: Arc<Lookup>,
    location: Box<dyn LocationSource>,
    default_city: String,
) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut app = App::new(lookup, tx);

    let (initial_tx, initial_rx) = oneshot::channel();
    app.locating = true;
    tokio::spawn(async move {
        let query = resolve_initial_query(location.as_ref(), &default_city).await;
        let _ = initial_tx.send(query);
    });

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = event_loop(&mut terminal, &mut app, rx, initial_rx).await;

    finish(result, tui::restore())
}

/// The event loop's own error wins; a restore failure is reported only
/// when the loop itself succeeded.
fn finish(result: Result<()>, restored: Result<()>) -> Result<()> {
    match (result, restored) {
        (Err(e), Err(restore_err)) => {
            tracing::error!("Failed to restore terminal: {:#}", restore_err);
            Err(e)
        }
        (Ok(()), Err(restore_err)) => Err(restore_err),
        (result, Ok(())) => result,
    }
}

async fn event_loop(
    terminal: &mut tui::Tui,
    app: &mut App,
    mut lookups: mpsc::UnboundedReceiver<LookupEvent>,
    mut initial: oneshot::Receiver<wxview_weather::Query>,
) -> Result<()> {
    let mut events = tui::EventHandler::new();
    let mut initial_pending = true;

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event),
            Some(event) = lookups.recv() => app.on_lookup_event(event),
            query = &mut initial, if initial_pending => {
                initial_pending = false;
                match query {
                    Ok(query) => {
                        app.start_initial(query);
                    }
                    Err(_) => {
                        tracing::warn!("Location task ended without a query");
                        app.locating = false;
                    }
                }
            }
            else => break,
        }
    }

    Ok(())
}
