//! HTTP ingress for storage-insert webhooks.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/`, `/analyze-document` | Run the pipeline for a trigger body |
//! | `OPTIONS` | `/`, `/analyze-document` | CORS preflight, returns `ok` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Responses
//!
//! ```json
//! { "success": true, "analysis": { "document_id": 42, "status": "completed", ... } }
//! { "error": "invalid trigger payload: record.file_path is required" }
//! ```
//!
//! Validation failures are `400`; every other failure is `500`. Unknown
//! routes (`404`), wrong methods (`405`) and oversized bodies (`413`) use
//! the same `{ "error" }` shape.
//!
//! # CORS
//!
//! `Access-Control-Allow-Origin: *`, `Access-Control-Allow-Headers:
//! Content-Type, Authorization` and `Access-Control-Allow-Methods: POST,
//! OPTIONS` are set on every response, errors and unknown routes included.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::config::Config;
use crate::error::AnnotatorError;
use crate::pipeline::{Outcome, Pipeline};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Build the pipeline from `config` and serve until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config).await?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("annotator listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(Arc::new(pipeline))).await?;
    Ok(())
}

/// All routes with the CORS headers applied.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let state = AppState { pipeline };

    Router::new()
        .route("/", post(handle_trigger).options(handle_preflight))
        .route(
            "/analyze-document",
            post(handle_trigger).options(handle_preflight),
        )
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .method_not_allowed_fallback(handle_method_not_allowed)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .with_state(state)
}

// ============ Error response ============

/// JSON body of every non-2xx response.
#[derive(Serialize)]
struct ErrorBody {
    /// Human-readable message, prefixed with the failure kind
    /// (e.g. `"storage error: object not found: documents/a.pdf"`).
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for AnnotatorError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.to_string())
    }
}

// ============ POST / ============

/// JSON body of a successful invocation.
#[derive(Serialize)]
struct SuccessBody {
    /// Always `true`; failures use [`ErrorBody`] instead.
    success: bool,
    /// The persisted row for a document, or the completion text in prompt mode.
    analysis: Outcome,
}

/// The body is read as raw bytes so malformed JSON becomes a uniform 400.
/// Oversized bodies keep axum's 413 status but get the same JSON shape.
async fn handle_trigger(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };
    match state.pipeline.handle(&body).await {
        Ok(analysis) => Json(SuccessBody {
            success: true,
            analysis,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn handle_preflight() -> &'static str {
    "ok"
}

async fn handle_not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "not found")
}

async fn handle_method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

// ============ GET /health ============

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// Crate version (from `Cargo.toml`).
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
