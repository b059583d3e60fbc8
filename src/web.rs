use std::sync::Arc;

use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::event::EventPayload;
use crate::format::format_event;
use crate::sink::{FileSink, SinkError};

pub struct AppState {
    pub sink: Arc<FileSink>,
    pub shutdown: CancellationToken,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            code,
            Json(ErrBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<SinkError> for ApiError {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Closed | SinkError::Cancelled => {
                ApiError::Unavailable("log sink is shutting down".to_string())
            }
            SinkError::Io(_) => ApiError::Internal("failed to write log".to_string()),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/logs", post(ingest_log))
        .route("/healthz", get(healthz))
        .layer(Extension(state))
}

async fn ingest_log(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<EventPayload>,
) -> Result<Response, ApiError> {
    let event = payload
        .into_event()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    log::debug!(target: "logd", "ingesting {} event dated {}", event.level, event.timestamp);

    let line = format_event(&event);
    let timestamp = event.timestamp;
    let sink = state.sink.clone();
    let cancel = state.shutdown.clone();

    // The sink fsyncs while holding its lock; that work has no business on
    // the async workers.
    let result = tokio::task::spawn_blocking(move || sink.write_line(&line, timestamp, &cancel))
        .await
        .map_err(|err| {
            log::error!(target: "logd", "sink write task panicked: {}", err);
            ApiError::Internal("failed to write log".to_string())
        })?;

    if let Err(err) = result {
        log::error!(target: "logd", "failed writing log line: {}", err);
        return Err(err.into());
    }

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "ok" }))).into_response())
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;
