//! Raw configuration shapes
//!
//! These structs mirror the YAML config file one-to-one. Validation and
//! cross-referencing happen in [`crate::config::registry`]; nothing here is
//! trusted until the registry has accepted the whole file.

use secrecy::SecretString;
use serde::Deserialize;

/// Upstream wire protocol family of a provider.
///
/// The kind decides which adapter encodes requests and decodes SSE frames
/// for all traffic of the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenRouter => "openrouter",
            Self::OpenAICompatible => "openai-compatible",
        }
    }
}

/// An upstream provider endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Provider {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: SecretString,
    #[serde(default)]
    pub use_proxy: bool,
}

/// A concrete upstream model hosted by one provider.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseModel {
    pub name: String,
    pub model_id: String,
    pub provider: String,
    pub context: u32,
    pub max_tokens: u32,
}

fn default_origin_reasoning() -> bool {
    true
}

/// A user-visible deep model composed of a reason model and an answer model.
#[derive(Debug, Clone, Deserialize)]
pub struct DeepModel {
    pub name: String,
    pub reason_model: String,
    pub answer_model: String,
    /// `true` when the reason provider emits reasoning in a dedicated
    /// field; `false` when it arrives inline in `<think>…</think>` tags.
    #[serde(default = "default_origin_reasoning")]
    pub is_origin_reasoning: bool,
}

/// The whole configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelFile {
    pub providers: Vec<Provider>,
    pub base_models: Vec<BaseModel>,
    pub deep_models: Vec<DeepModel>,
}
