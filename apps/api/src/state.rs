use std::sync::Arc;

use crate::config::Config;
use crate::events::EventLog;
use crate::humanize::client::RewriteService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Outbound rewrite service. The real `HumanizerClient` in production;
    /// swapped for fakes in tests.
    pub humanizer: Arc<dyn RewriteService>,
    /// Append-only JSONL observability sink.
    pub events: EventLog,
    pub config: Config,
}
