//! Gateway entry point
//!
//! Loads `.env`, installs tracing, validates the model configuration and
//! serves the HTTP surface. A config failure exits non-zero before binding.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use deepfuse::client::UpstreamClient;
use deepfuse::config::ModelRegistry;
use deepfuse::pipeline::DeepPipeline;
use deepfuse::server::{AppState, build_router};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "model.yaml".to_string());
    let registry = match ModelRegistry::from_path(Path::new(&config_path)) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            tracing::error!(error = %e, path = %config_path, "failed to load model config");
            std::process::exit(1);
        }
    };
    tracing::info!(
        deep_models = registry.list_deep_models().len(),
        path = %config_path,
        "model config loaded"
    );

    let api_key: Arc<str> = match std::env::var("API_KEY") {
        Ok(key) if !key.trim().is_empty() => Arc::from(key),
        _ => {
            tracing::error!("API_KEY environment variable is required");
            std::process::exit(1);
        }
    };

    let client = match UpstreamClient::new() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "failed to build upstream client");
            std::process::exit(1);
        }
    };

    let pipeline = DeepPipeline::new(registry.clone(), client);
    let allow_origins = std::env::var("ALLOW_ORIGINS").unwrap_or_else(|_| "*".to_string());
    let app = build_router(
        AppState {
            registry,
            pipeline,
            api_key,
        },
        &allow_origins,
    );

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let addr = format!("{host}:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "deepfuse listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
