mod bridge;
mod config;
mod customization;
mod errors;
mod layout;
mod models;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::bridge::{RenderBridge, TracingSurface};
use crate::config::{Config, StoreBackend};
use crate::customization::CustomizationManager;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{FileStore, MemoryStore, PreferenceStore, RedisStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (aborts on invalid env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV preview engine v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the persisted-state backend
    let store = open_store(&config.store).await?;
    info!("Preference store initialized ({})", config.store.name());

    // Customization snapshot (merged over defaults; malformed state is tolerated)
    let customization = Arc::new(CustomizationManager::load(store.clone()).await);

    // Render bridge: restores the last form and starts the single debounce worker
    let bridge = RenderBridge::load(store.clone(), customization.clone(), config.debounce).await;
    bridge.attach_surface(Arc::new(TracingSurface)).await;
    bridge.spawn_debouncer();
    bridge.request_regeneration();

    // Build app state
    let state = AppState {
        store,
        customization,
        bridge,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // the form UI is served from another origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Opens the configured backend. Redis is connected eagerly so a bad URL fails startup.
async fn open_store(backend: &StoreBackend) -> Result<Arc<dyn PreferenceStore>> {
    let store: Arc<dyn PreferenceStore> = match backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File { dir } => Arc::new(
            FileStore::open(dir.clone())
                .with_context(|| format!("Failed to open store directory {}", dir.display()))?,
        ),
        StoreBackend::Redis { url } => Arc::new(
            RedisStore::connect(url)
                .await
                .context("Failed to connect to Redis")?,
        ),
    };
    Ok(store)
}
