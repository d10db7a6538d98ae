use std::sync::Arc;

use tokio::sync::mpsc;
use wxview_weather::{Lookup, LookupEvent, LookupId, Query, ViewState};

/// Terminal application state: the weather view plus input handling flags.
pub struct App {
    pub state: ViewState,
    /// Waiting for the startup location source
    pub locating: bool,
    pub should_quit: bool,
    lookup: Arc<Lookup>,
    tx: mpsc::UnboundedSender<LookupEvent>,
}

impl App {
    pub fn new(lookup: Arc<Lookup>, tx: mpsc::UnboundedSender<LookupEvent>) -> Self {
        Self {
            state: ViewState::new(),
            locating: false,
            should_quit: false,
            lookup,
            tx,
        }
    }

    /// True while a lookup is in flight, or while the startup location is
    /// still resolving and the user has not searched yet
    pub fn is_busy(&self) -> bool {
        self.state.loading || (self.locating && self.state.latest().is_none())
    }

    pub fn push_char(&mut self, c: char) {
        self.state.query_text.push(c);
    }

    pub fn backspace(&mut self) {
        self.state.query_text.pop();
    }

    pub fn clear_input(&mut self) {
        self.state.query_text.clear();
    }

    /// Look up the typed city. Blank input starts nothing.
    pub fn submit(&mut self) -> Option<LookupId> {
        let query = Query::city(&self.state.query_text)?;
        Some(self.start(query))
    }

    /// Begin a fresh lookup cycle for `query`.
    pub fn start(&mut self, query: Query) -> LookupId {
        let id = self.lookup.next_id();
        self.state.begin(id);
        self.lookup.spawn(id, query, self.tx.clone());
        id
    }

    /// The startup query, unless the user already searched while the
    /// location source was still resolving.
    pub fn start_initial(&mut self, query: Query) -> Option<LookupId> {
        self.locating = false;
        if self.state.latest().is_some() {
            tracing::debug!("Skipping startup lookup for {}; user already searched", query);
            return None;
        }
        Some(self.start(query))
    }

    pub fn on_lookup_event(&mut self, event: LookupEvent) {
        self.state.apply(event);
    }
}
