//! Route handlers

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::GatewayError;
use crate::protocol::{ModelList, model_list};
use crate::types::ChatCompletionRequest;

use super::AppState;

/// Authenticated liveness endpoint.
pub async fn root(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, Response> {
    authorize(&headers, &state.api_key).map_err(error_response)?;
    Ok(Json(json!({ "message": "Welcome to deepfuse" })))
}

/// OpenAI-shaped listing of the configured deep models.
pub async fn list_models(State(state): State<AppState>) -> Json<ModelList> {
    Json(model_list(state.registry.list_deep_models()))
}

/// The chat-completions endpoint: SSE stream or assembled JSON.
pub async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    if let Err(e) = authorize(&headers, &state.api_key) {
        return error_response(e);
    }
    if let Err(e) = request.validate() {
        tracing::warn!(error = %e, model = %request.model, "rejecting request");
        return error_response(e);
    }

    let params = request.params();
    tracing::info!(
        model = %request.model,
        stream = request.stream,
        messages = request.messages.len(),
        "chat completion requested"
    );

    if request.stream {
        match state
            .pipeline
            .stream_completion(&request.model, request.messages, params)
        {
            Ok(frames) => (
                [
                    (
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("text/event-stream"),
                    ),
                    (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
                ],
                Body::from_stream(frames),
            )
                .into_response(),
            Err(e) => error_response(e),
        }
    } else {
        match state
            .pipeline
            .complete(&request.model, request.messages, params)
            .await
        {
            Ok(completion) => Json(completion).into_response(),
            Err(e) => error_response(e),
        }
    }
}

/// Literal bearer-token comparison against the configured key.
fn authorize(headers: &HeaderMap, api_key: &str) -> Result<(), GatewayError> {
    let expected = format!("Bearer {api_key}");
    match headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        Some(value) if value == expected => Ok(()),
        _ => Err(GatewayError::Unauthorized),
    }
}

fn error_response(error: GatewayError) -> Response {
    (
        error.status_code(),
        Json(json!({ "error": error.user_message() })),
    )
        .into_response()
}
