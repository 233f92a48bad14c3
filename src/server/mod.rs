//! HTTP boundary: `POST /stitch` and `GET /health`.

pub mod error;
pub mod form;

pub use error::{ApiError, ErrorBody};
pub use form::{apply_form_field, StitchForm};

use crate::config::Config;
use crate::data::encode_panorama;
use crate::logging::{self, RequestSpan};
use crate::pipeline::Stitcher;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Instrument;
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let server = &state.config.server;
    let body_limit = server.max_upload_size_mb * 1024 * 1024;
    let cors = if server.enable_cors {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/stitch", post(stitch_handler))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let address = config.server.socket_address();
    let app = build_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Stitch server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Stitch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn stitch_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    let correlation_id = Uuid::new_v4();
    let request_span = RequestSpan::new("/stitch", correlation_id);

    let mut response = process_stitch(&state, multipart, &request_span, correlation_id)
        .instrument(request_span.span().clone())
        .await
        .unwrap_or_else(|e| e.into_response());

    request_span.record_status(response.status().as_u16());
    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn process_stitch(
    state: &AppState,
    multipart: Multipart,
    request_span: &RequestSpan,
    correlation_id: Uuid,
) -> Result<Response, ApiError> {
    let form = StitchForm::read(multipart, &state.config.stitch, request_span).await?;
    let stitcher = Stitcher::new(form.config)?;
    let quality = state.config.server.jpeg_quality;
    let limit_ms = state.config.server.request_timeout_ms;

    let span = tracing::Span::current();
    let job = tokio::task::spawn_blocking(move || {
        let _enter = span.enter();
        logging::set_correlation_id(correlation_id);
        let result = stitcher
            .stitch_bytes(&form.image1, &form.image2)
            .and_then(|panorama| encode_panorama(&panorama.image, quality));
        logging::clear_correlation_id();
        result
    });

    // The blocking task keeps running after a timeout; only the response is abandoned.
    let encoded = match tokio::time::timeout(Duration::from_millis(limit_ms), job).await {
        Err(_) => return Err(ApiError::timeout(limit_ms)),
        Ok(Err(join_error)) => {
            tracing::error!(error = %join_error, "Stitch task panicked");
            return Err(ApiError::internal("Internal", "stitch failed"));
        }
        Ok(Ok(result)) => result?,
    };

    Ok((
        [
            (header::CONTENT_TYPE, encoded.mime),
            (header::CACHE_CONTROL, "no-store"),
        ],
        encoded.bytes,
    )
        .into_response())
}
