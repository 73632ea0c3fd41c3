//! Request handlers

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use futures::StreamExt;
use tracing::error;
use tracing::info;

use crate::api::types::error_status;
use crate::api::types::ApiResponse;
use crate::api::types::ErrorBody;
use crate::api::types::HealthResponse;
use crate::errors::GrainwiseError;
use crate::models::ChatRequest;
use crate::models::PipelineResult;
use crate::rag::Orchestrator;
use crate::rag::PipelineOutcome;
use crate::Result;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Whole-request deadline; in-flight work past it is abandoned.
    pub request_timeout: Duration,
}

type ErrorReply = (StatusCode, Json<ApiResponse<()>>);

fn reject(e: &GrainwiseError) -> ErrorReply {
    (
        error_status(e),
        Json(ApiResponse::error(ErrorBody::from_error(e))),
    )
}

/// Health check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn run_pipeline(state: &AppState, request: &ChatRequest) -> Result<PipelineOutcome> {
    match tokio::time::timeout(
        state.request_timeout,
        state.orchestrator.execute(&request.messages),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => Err(GrainwiseError::StageTimeout {
            stage: crate::errors::Stage::Pipeline,
            timeout: state.request_timeout,
        }),
    }
}

/// Non-streaming query: returns the full pipeline result as JSON.
pub async fn chat_query(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> std::result::Result<Json<ApiResponse<PipelineResult>>, ErrorReply> {
    info!("POST /api/chat/query ({} messages)", request.messages.len());

    match run_pipeline(&state, &request).await {
        Ok(outcome) => Ok(Json(ApiResponse::success(outcome.result))),
        Err(e) => {
            error!("Pipeline failed: {e}");
            Err(reject(&e))
        }
    }
}

/// Primary path: incrementally streamed answer text. The trace run id is
/// attached as the `x-run-id` header, out of band from the token stream.
/// A failure after streaming has started emits one structured JSON error
/// chunk in place of further tokens; delivered tokens are not retracted.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> std::result::Result<Response, ErrorReply> {
    info!("POST /api/chat ({} messages)", request.messages.len());

    let outcome = match run_pipeline(&state, &request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Pipeline failed: {e}");
            return Err(reject(&e));
        }
    };

    let answer = state
        .orchestrator
        .stream_result(&request.messages, &outcome.result)
        .await
        .map_err(|e| {
            error!("Streaming setup failed: {e}");
            reject(&e)
        })?;

    let body_stream = answer.into_stream().map(|item| {
        Ok::<Bytes, Infallible>(match item {
            Ok(token) => Bytes::from(token),
            Err(e) => {
                error!("Stream interrupted: {e}");
                let body = serde_json::json!({ "error": ErrorBody::from_error(&e) });
                Bytes::from(body.to_string())
            }
        })
    });

    let mut response = Response::new(Body::from_stream(body_stream));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    if let Ok(run_id) = HeaderValue::from_str(&outcome.run_id.to_string()) {
        response.headers_mut().insert("x-run-id", run_id);
    }
    Ok(response)
}
