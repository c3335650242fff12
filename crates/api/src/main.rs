use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use portal_core::ports::{Geocoder, SearchIndex, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portal_api::config::ServerConfig;
use portal_api::router::build_app_router;
use portal_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "portal_api=debug,portal_events=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        search_index = config.algolia.is_some(),
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = portal_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    portal_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    portal_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store: Arc<dyn Store> = Arc::new(portal_db::PgStore::new(pool));

    // --- External services ---
    let geocoder: Arc<dyn Geocoder> = Arc::new(
        portal_geocode::PostcodesIo::new(&config.geocoder)
            .expect("Failed to build geocoder HTTP client"),
    );

    let search_index: Option<Arc<dyn SearchIndex>> = config.algolia.as_ref().map(|algolia| {
        let index = portal_search::AlgoliaIndex::from_config(reqwest::Client::new(), algolia);
        Arc::new(index) as Arc<dyn SearchIndex>
    });
    if search_index.is_none() {
        tracing::warn!("Search index not configured; searches use the primary store only");
    }

    // --- Event bus ---
    let event_bus = Arc::new(portal_events::EventBus::default());
    tracing::info!("Event bus created");

    // Spawn index sync (mirrors document changes into the search index).
    let sync_handle = search_index.as_ref().map(|index| {
        let sync = portal_events::IndexSync::new(
            Arc::clone(&store),
            Arc::clone(index),
            Arc::clone(&geocoder),
        );
        tokio::spawn(sync.run(event_bus.subscribe()))
    });

    // --- App state ---
    let state = AppState {
        store,
        search_index,
        geocoder,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Dropping the last sender closes the channel; index sync drains and exits.
    drop(event_bus);
    if let Some(handle) = sync_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Index sync shut down");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
