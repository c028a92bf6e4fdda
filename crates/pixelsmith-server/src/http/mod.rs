//! HTTP surface: router construction, middleware and the serve loop.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use pixelsmith_core::{OutputFormat, TransformPipeline};
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{self, TraceLayer},
};
use tracing::{error, info, Level};

use crate::config::Config;

pub mod error;
mod process;

pub use error::AppError;

/// Room for multipart boundaries and the text fields around the image part.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Clone, Copy)]
pub(crate) struct AppState {
    pipeline: TransformPipeline,
    default_format: OutputFormat,
    default_quality: u8,
}

/// Build the application router from the config.
pub fn bootstrap(cfg: &Config) -> Result<Router> {
    let state = AppState {
        pipeline: TransformPipeline::new(cfg.limits()),
        default_format: cfg.app.default_format,
        default_quality: cfg.default_quality(),
    };
    let body_limit = cfg
        .app
        .max_upload_bytes
        .checked_add(MULTIPART_OVERHEAD)
        .context("app.max_upload_bytes is too large")?;

    let api = Router::new()
        .route("/api/process", post(process::process))
        .layer(DefaultBodyLimit::max(body_limit));

    let app = Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .merge(api)
        .with_state(state)
        .layer((
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
            TimeoutLayer::new(Duration::from_secs(cfg.app.request_timeout_secs)),
            CatchPanicLayer::new(),
            CorsLayer::permissive(),
        ));

    Ok(app)
}

/// Bind `listen` and serve `router` until Ctrl+C or SIGTERM.
pub async fn serve(router: Router, listen: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind to {}", listen))?;
    info!("listening on {}", listen);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("error running HTTP server")?;

    info!("server stopped");
    Ok(())
}

async fn index() -> &'static str {
    "Image processing server is running"
}

async fn healthz() -> &'static str {
    "pong"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
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
    info!("shutdown signal received");
}
