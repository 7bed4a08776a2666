use crate::cache::{start_sweep_task, MetadataCache};
use crate::config::Config;
use crate::service::MediaService;
use anyhow::{Context, Result};
use axum::{
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    compression::{
        predicate::{DefaultPredicate, NotForContentType, Predicate},
        CompressionLayer,
    },
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod metrics;
pub mod routes;

pub use error::AppError;
pub use metrics::Metrics;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub service: Arc<MediaService>,
    pub metrics: Arc<Metrics>,
}

impl AppContext {
    /// Build the context with a fresh metadata cache.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let cache = Arc::new(MetadataCache::new(
            config.parser.cache_max_entries,
            Duration::from_secs(config.parser.cache_ttl_secs),
        ));
        let service = Arc::new(MediaService::new(Arc::clone(&config), cache));
        Self {
            config,
            service,
            metrics: Arc::new(Metrics::new()),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes::api_routes())
        .fallback(routes::media_request);

    let app = if ctx.config.server.cors {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers(Any),
        )
    } else {
        app
    };

    // Segments are already compressed media
    let app = if ctx.config.server.gzip {
        app.layer(CompressionLayer::new().compress_when(
            DefaultPredicate::new().and(NotForContentType::const_new("video/")),
        ))
    } else {
        app
    };

    app.layer(TraceLayer::new_for_http()).with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::new(config);
    start_sweep_task(Arc::clone(ctx.service.cache()));

    for (id, app) in &ctx.config.applications {
        tracing::info!("Application '{}' serving from {}", id, app.origin_path);
    }

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

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
