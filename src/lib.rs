//! deepfuse
//!
//! An OpenAI-compatible chat-completions gateway that composes two upstream
//! language models into one logical "deep" model: a reasoning model streams
//! chain-of-thought first, then an answer model produces the final response
//! with that reasoning in context. One endpoint, two providers, one stream.
//!
//! The crate is organized bottom-up:
//!
//! - [`config`] — YAML model configuration and the validated registry
//! - [`client`] — provider-agnostic streaming HTTP client
//! - [`wire`] — per-provider request encoding and SSE decoding
//! - [`reasoning`] — native / `<think>`-tag reasoning extraction
//! - [`pipeline`] — the two-phase reason→answer orchestration
//! - [`protocol`] — OpenAI-shaped output frames and objects
//! - [`server`] — the axum HTTP surface

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod reasoning;
pub mod server;
pub mod stream;
pub mod types;
pub mod wire;

pub use client::{UpstreamClient, UpstreamTimeouts};
pub use config::{ModelRegistry, ProviderKind};
pub use error::GatewayError;
pub use pipeline::DeepPipeline;
pub use types::{ChatCompletionRequest, ChatMessage, ChatParams, MessageRole};
