//! Pong tracker binary entrypoint wiring REST, SSE and the score store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pong_tracker_back::{
    config::AppConfig,
    dao::score_gateway::{ScoreGateway, in_memory::InMemoryScoreGateway},
    routes,
    services::match_sweeper,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let gateway = connect_gateway().await?;
    let app_state = AppState::new(gateway, config);
    tokio::spawn(match_sweeper::run(app_state.clone()));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Select the score store: CouchDB when `COUCH_BASE_URL` is set, memory otherwise.
#[cfg(feature = "couch-store")]
async fn connect_gateway() -> anyhow::Result<Arc<dyn ScoreGateway>> {
    use pong_tracker_back::dao::score_gateway::couchdb::{CouchConfig, CouchScoreGateway};

    if env::var_os("COUCH_BASE_URL").is_none() {
        info!("COUCH_BASE_URL not set; keeping scores in memory");
        return Ok(Arc::new(InMemoryScoreGateway::new()));
    }

    let config = CouchConfig::from_env().context("reading CouchDB configuration")?;
    let database = config.database.clone();
    let gateway = CouchScoreGateway::connect(config)
        .await
        .context("connecting to CouchDB")?;
    info!(%database, "connected to CouchDB");
    Ok(Arc::new(gateway))
}

#[cfg(not(feature = "couch-store"))]
async fn connect_gateway() -> anyhow::Result<Arc<dyn ScoreGateway>> {
    info!("built without a database backend; keeping scores in memory");
    Ok(Arc::new(InMemoryScoreGateway::new()))
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

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
