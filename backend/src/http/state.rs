//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::ReportRepository;
use crate::services::{ReportGenerator, RunDispatcher};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Report store read by the query endpoints
    pub repository: Arc<dyn ReportRepository>,
    /// Submits generation runs without waiting for them
    pub dispatcher: RunDispatcher,
}

impl AppState {
    /// Build state around a generator; reads go to the generator's repository.
    pub fn new(generator: Arc<ReportGenerator>) -> Self {
        Self::with_dispatcher(RunDispatcher::new(generator))
    }

    pub fn with_dispatcher(dispatcher: RunDispatcher) -> Self {
        Self {
            repository: Arc::clone(dispatcher.generator().repository()),
            dispatcher,
        }
    }

    pub fn generator(&self) -> &ReportGenerator {
        self.dispatcher.generator()
    }
}
