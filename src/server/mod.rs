use crate::channels::{spawn_eviction_task, ChannelGuard};
use crate::config::Config;
use crate::library::Catalog;
use crate::playback::SessionStore;
use crate::streaming;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod routes_library;
pub mod routes_session;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Collection metadata map, bulk-written by the conversion pipeline
    /// before the listener binds.
    pub catalog: Arc<Catalog>,
    /// Channel admission controller.
    pub channels: Arc<ChannelGuard>,
    /// Per-session playlist store.
    pub playlists: Arc<SessionStore>,
}

impl AppContext {
    pub fn new(config: Config, catalog: Arc<Catalog>) -> Self {
        let channels = Arc::new(ChannelGuard::new(
            config.channels.max_channels,
            std::time::Duration::from_secs(config.channels.idle_timeout_secs),
        ));
        let playlists = Arc::new(SessionStore::new(Arc::clone(&catalog)));
        Self {
            config: Arc::new(config),
            catalog,
            channels,
            playlists,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .nest("/hls", streaming::hls_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn api_routes() -> Router<AppContext> {
    routes_session::session_routes().merge(routes_library::library_routes())
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid server address")?;

    // Reclaim slots from clients that disconnect without releasing.
    spawn_eviction_task(
        Arc::clone(&ctx.channels),
        Arc::clone(&ctx.playlists),
        ctx.config.channels.eviction_interval_secs,
    );

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
