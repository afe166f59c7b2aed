//! HTTP surface
//!
//! Thin axum layer over the pipeline: request parsing, bearer-token check,
//! CORS, and the three routes. All model behavior lives below this module.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::config::ModelRegistry;
use crate::pipeline::DeepPipeline;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub pipeline: DeepPipeline,
    pub api_key: Arc<str>,
}

/// Build the application router.
pub fn build_router(state: AppState, allow_origins: &str) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/v1/models", get(handlers::list_models))
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .layer(cors_layer(allow_origins))
        .with_state(state)
}

/// CORS policy from the comma-separated `ALLOW_ORIGINS` value.
///
/// `*` opens the gateway to any origin (without credentials — browsers
/// reject credentialed wildcards); an explicit list allows credentials.
fn cors_layer(allow_origins: &str) -> CorsLayer {
    let allow_origins = allow_origins.trim();
    if allow_origins.is_empty() || allow_origins == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = allow_origins
        .split(',')
        .filter_map(|origin| {
            let origin = origin.trim();
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "ignoring unparseable ALLOW_ORIGINS entry");
                    None
                }
            }
        })
        .collect();
    // Credentialed CORS cannot use wildcard methods/headers.
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
