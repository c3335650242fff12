use std::sync::Arc;

use portal_core::ports::{Geocoder, SearchIndex, Store};
use portal_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Primary document store.
    pub store: Arc<dyn Store>,
    /// Search index; `None` when no index is configured.
    pub search_index: Option<Arc<dyn SearchIndex>>,
    pub geocoder: Arc<dyn Geocoder>,
    /// Server configuration (JWT settings are read by the auth extractor).
    pub config: Arc<ServerConfig>,
    /// Bus for document-change events consumed by index sync.
    pub event_bus: Arc<EventBus>,
}
