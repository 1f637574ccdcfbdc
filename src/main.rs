//! Quiz Live Back binary entrypoint wiring REST, WebSocket and storage layers.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_live_back::{
    config::{AppConfig, StoreBackend},
    dao::game_store::{GameStore, memory::InMemoryGameStore},
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let port = config.port;
    let app_state = AppState::new(config);

    spawn_storage(app_state.clone()).await;
    let app = routes::router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the configured storage backend. MongoDB is supervised in the background so the
/// server can start, and stay up, in degraded mode.
async fn spawn_storage(state: SharedState) {
    match state.config().store {
        StoreBackend::Memory => {
            info!("using in-memory storage; nothing will survive a restart");
            state
                .install_game_store(Arc::new(InMemoryGameStore::new()))
                .await;
        }
        StoreBackend::Mongo => spawn_mongo_supervisor(state),
    }
}

#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: SharedState) {
    use quiz_live_back::dao::{game_store::mongodb, storage::StorageError};

    let uri = state.config().mongo_uri.clone();
    let db_name = state.config().mongo_db.clone();
    tokio::spawn(storage_supervisor::run(state, move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let store = mongodb::connect(&uri, &db_name).await?;
            Ok::<Arc<dyn GameStore>, StorageError>(Arc::new(store))
        }
    }));
}

#[cfg(not(feature = "mongo-store"))]
fn spawn_mongo_supervisor(state: SharedState) {
    tracing::warn!("built without MongoDB support; falling back to in-memory storage");
    tokio::spawn(storage_supervisor::run(state, || async {
        Ok::<Arc<dyn GameStore>, quiz_live_back::dao::storage::StorageError>(Arc::new(
            InMemoryGameStore::new(),
        ))
    }));
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
