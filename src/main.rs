//! Play Nine Back binary entrypoint wiring the REST surface, SSE, the stores
//! and the completion API.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use play_nine_back::{
    config::AppConfig,
    dao::{
        game_store::{
            GameStore,
            http::{HttpGameStore, HttpStoreConfig},
            sqlite::{SqliteConfig, SqliteGameStore},
        },
        local_cache::LocalCache,
    },
    routes,
    services::{
        completion::OpenRouterClient, connectivity::ConnectivityMonitor, reconciler::Reconciler,
        session_service, settings_service, sse_events, transcript_parser::TranscriptParser,
    },
    state::{AppState, SharedState, state_machine::GamePhase},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    let sqlite: Arc<dyn GameStore> = Arc::new(
        SqliteGameStore::connect(SqliteConfig::new(config.database_url.clone()))
            .await
            .context("opening the SQLite store")?,
    );
    let session_store: Arc<dyn GameStore> = match config.remote_api_url.as_deref() {
        Some(url) => {
            let mut remote = HttpStoreConfig::new(url);
            if let Some(token) = config.remote_api_token.as_deref() {
                remote = remote.with_bearer_token(token);
            }
            info!(%url, "session games are stored on a remote instance");
            Arc::new(HttpGameStore::new(remote).context("building the remote store client")?)
        }
        None => sqlite.clone(),
    };

    let cache = Arc::new(LocalCache::new(config.local_cache_path.clone()));
    let reconciler = Arc::new(Reconciler::new(
        session_store,
        cache,
        config.remote_timeout,
    ));
    let completion =
        Arc::new(OpenRouterClient::new(&config.llm).context("building the completion client")?);
    if config.llm.api_key.is_none() {
        warn!("no completion API key configured; transcripts cannot be parsed");
    }
    let parser = TranscriptParser::new(completion, config.llm.model_settings());

    let app_state = AppState::new(sqlite, reconciler.clone(), parser);
    settings_service::restore(&app_state).await;

    let connectivity = reconciler.refresh().await;
    info!(?connectivity, "initial history loaded");
    resume_cached_game(&app_state).await;

    let _monitor = ConnectivityMonitor::spawn(reconciler, config.connectivity_interval);
    let _forwarder = sse_events::spawn_connectivity_forwarder(app_state.clone());

    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Bring back the game a previous run left in the cache. A game that was
/// complete but never saved gets one more save attempt.
async fn resume_cached_game(state: &SharedState) {
    match session_service::restore_session(state).await {
        Ok(Some(GamePhase::Complete)) => match session_service::finish_game(state).await {
            Ok(game) => info!(id = %game.id, "saved the game left complete by a previous run"),
            Err(err) => warn!(error = %err, "complete game still unsaved; retry with /session/finish"),
        },
        Ok(_) => {}
        Err(err) => warn!(error = %err, "failed to resume the cached game"),
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
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

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
