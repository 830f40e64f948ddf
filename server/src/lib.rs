use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    classify::ServerErrorsFailureClass, limit::RequestBodyLimitLayer, services::ServeDir,
    trace::TraceLayer,
};
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

pub mod allocator;
pub mod config;
pub mod domain;
pub mod file_reply;
pub mod handlers;
pub mod ingest;
pub mod notify;
pub mod sniff;
pub mod storage;

#[cfg(test)] // <-- not needed in integration tests
extern crate rstest;

use crate::allocator::IdAllocator;
use crate::config::Config;
use crate::handlers::AppState;
use crate::ingest::Pipeline;
use crate::storage::StorageDir;

const BODY_LIMIT: usize = 2 * 1024 * 1024 * 1024; /* 2GB */

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::upload,
        handlers::admin,
        handlers::images,
        handlers::download,
        handlers::delete
    ),
    components(schemas(kernel::ImageEntry)),
    tags(
        (name = "images", description = "Upload, list, download and delete images"),
        (name = "admin", description = "Shared secret gate")
    )
)]
pub struct ApiDoc;

pub async fn run(config: Config) -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "picdrop=debug,server=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.secret_key.is_none() {
        tracing::warn!("{} is not set, admin pages are locked", config::SECRET_KEY_VAR);
    }
    tracing::info!("storing images in {}", config.data_dir.display());

    let socket = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(socket).await?;
    tracing::debug!("listening on {socket}");

    let app = create_routes(&config);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Builds the router. The upload id counter starts from zero on every call.
pub fn create_routes(config: &Config) -> Router {
    let storage = StorageDir::new(&config.data_dir);
    let state = AppState {
        pipeline: Pipeline::new(Arc::new(IdAllocator::new()), storage),
        secret_key: config.secret_key.as_deref().map(Arc::from),
        notifier: Arc::new(config.notifier.clone()),
    };

    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/admin", get(handlers::admin).post(handlers::admin))
        .route("/images", get(handlers::images))
        .route("/download", get(handlers::download))
        .route("/delete", post(handlers::delete))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .nest_service(kernel::IMAGE_PREFIX, ServeDir::new(&config.data_dir))
        .fallback_service(ServeDir::new(&config.static_dir))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Server error: {error}");
                    },
                ))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
                .into_inner(),
        )
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}
