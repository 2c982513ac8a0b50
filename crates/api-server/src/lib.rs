//! Exercise Duel API server
//!
//! HTTP surface over the duel engine: product info, session lifecycle and
//! results. Sessions live in memory and are driven by spawned timers.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use duel_core::{DuelError, PathProvider};
use path_lab::{BundleDirProvider, SimulatedProvider};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod game_routes;
pub mod registry;

pub use config::ServerConfig;
pub use registry::{Action, SessionError, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub provider: Arc<dyn PathProvider>,
    pub registry: Arc<SessionRegistry>,
}

/// Uniform response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying the HTTP status to answer with
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "request failed: {:#}", self.error);
        } else {
            tracing::debug!(status = %self.status, "request rejected: {:#}", self.error);
        }
        let body = ApiResponse::<()>::error(format!("{:#}", self.error));
        (self.status, Json(body)).into_response()
    }
}

/// Map engine errors to status codes.
pub fn duel_err(e: DuelError) -> AppError {
    let status = match &e {
        DuelError::UnknownProduct(_) => StatusCode::NOT_FOUND,
        DuelError::ActionOutOfPhase { .. } | DuelError::StaleTimerFired { .. } => {
            StatusCode::CONFLICT
        }
        DuelError::InvalidBundle(_) | DuelError::Provider(_) => StatusCode::SERVICE_UNAVAILABLE,
        DuelError::InvalidTiming(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    AppError::with_status(status, e.into())
}

pub fn session_err(e: SessionError) -> AppError {
    match e {
        SessionError::NotFound(_) => AppError::with_status(StatusCode::NOT_FOUND, e.into()),
        SessionError::Duel(inner) => duel_err(inner),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    products: Vec<String>,
    active_sessions: usize,
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok",
        products: state
            .provider
            .products()
            .iter()
            .map(|m| m.kind.id().to_string())
            .collect(),
        active_sessions: state.registry.len(),
    }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .merge(game_routes::game_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Install the global subscriber. `RUST_LOG` filters (default `info`);
/// `RUST_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        timing = ?config.timing,
        "Configuration loaded"
    );

    let provider: Arc<dyn PathProvider> = match &config.bundle_dir {
        Some(dir) => {
            let provider = BundleDirProvider::load(dir)
                .await
                .with_context(|| format!("Failed to load bundles from {}", dir.display()))?;
            tracing::info!(dir = %dir.display(), products = provider.products().len(), "Serving precomputed bundles");
            Arc::new(provider)
        }
        None => {
            tracing::info!(seed = ?config.seed, "Serving simulated paths");
            Arc::new(SimulatedProvider::new(config.seed))
        }
    };

    let registry = SessionRegistry::new(config.session_ttl);
    let _sweeper = registry.spawn_sweeper(config.sweep_interval);

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        config: Arc::new(config),
        provider,
        registry,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Exercise duel server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
