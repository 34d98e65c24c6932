//! HTTP transport implementation

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{Extension, Router, middleware};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::Claims;
use crate::config::ServerConfig;
use crate::constants::STATUS_HEALTHY;
use crate::dispatch::{ChatCompletionRequest, CompletionDispatcher, DispatchError};
use crate::normalize::QueryParams;
use crate::pipeline::{Pipeline, run_pipeline};
use crate::{Error, Result};

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct ModelPath {
    provider: String,
    model_id: String,
}

/// State shared by route handlers
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<dyn CompletionDispatcher>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    #[must_use]
    pub fn new(dispatcher: Arc<dyn CompletionDispatcher>) -> Self {
        Self { dispatcher }
    }
}

/// Build the gateway router.
///
/// The pipeline wraps an outer router whose fallback is the application
/// router, so the request target is repaired before any route is matched.
pub fn build_router(state: AppState, pipeline: Pipeline, request_timeout: Duration) -> Router {
    #[allow(unused_mut)]
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/models/list", get(list_models_handler))
        .route("/models/{provider}/{model_id}", post(completion_handler))
        .route(
            "/models/{provider}/{model_id}/chat/completions",
            post(completion_handler),
        );

    #[cfg(feature = "metrics")]
    {
        app = app.route("/metrics", get(metrics_handler));
    }

    let app = app.with_state(state);

    Router::new()
        .fallback_service(app)
        .layer(middleware::from_fn_with_state(pipeline, run_pipeline))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
}

/// Serve `router` until `shutdown` resolves
pub async fn run_http(
    config: &ServerConfig,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::new(config.host, config.port);
    emit_security_warnings(config.host);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Transport(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("HTTP server listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Transport(format!("HTTP server error: {e}")))?;

    tracing::info!("HTTP server shutdown complete");
    Ok(())
}

fn emit_security_warnings(host: IpAddr) {
    let is_all_interfaces = host == IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        || host == IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED);

    if is_all_interfaces {
        tracing::warn!(
            "HTTP server binding to all interfaces ({host}). \
             Ensure TLS is terminated in front of the gateway."
        );
    } else if !host.is_loopback() {
        tracing::warn!(
            "HTTP server binding to non-loopback address ({host}). \
             Ensure network security policies are in place."
        );
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: STATUS_HEALTHY,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_models_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dispatcher.supported_models())
}

async fn completion_handler(
    State(state): State<AppState>,
    Path(ModelPath { provider, model_id }): Path<ModelPath>,
    RawQuery(query): RawQuery,
    Extension(claims): Extension<Claims>,
    Json(mut request): Json<ChatCompletionRequest>,
) -> std::result::Result<Json<Value>, DispatchError> {
    let params = query.as_deref().map(QueryParams::parse).unwrap_or_default();

    request.model = format!("{provider}/{model_id}");
    if let Some(session) = params.last("session").filter(|s| !s.is_empty()) {
        request.session = Some(session.to_string());
    }

    tracing::info!(
        model = %request.model,
        sub = claims.subject().unwrap_or("-"),
        session = request.session.as_deref().unwrap_or("-"),
        stream = request.stream,
        "Dispatching chat completion"
    );

    let result = state.dispatcher.complete(request).await;

    #[cfg(feature = "metrics")]
    crate::observability::record_completion(
        &provider,
        result
            .as_ref()
            .map_or_else(|e| e.status().as_u16(), |_| StatusCode::OK.as_u16()),
    );

    result.map(Json)
}

#[cfg(feature = "metrics")]
async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        crate::observability::render_metrics(),
    )
}
