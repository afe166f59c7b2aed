//! Downstream request types
//!
//! The shapes accepted on `/v1/chat/completions`, mirroring the OpenAI chat
//! API. Sampling parameters carry the gateway defaults and the sonnet
//! temperature restriction is validated here before any upstream call.

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single chat message, forwarded upstream verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters passed through to the upstream providers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatParams {
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            top_p: 0.9,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        }
    }
}

fn default_stream() -> bool {
    true
}

fn default_temperature() -> f32 {
    0.5
}

fn default_top_p() -> f32 {
    0.9
}

/// Body of a `/v1/chat/completions` request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default)]
    pub presence_penalty: f32,
    #[serde(default)]
    pub frequency_penalty: f32,
}

impl ChatCompletionRequest {
    /// Collect the sampling parameters for the pipeline.
    pub fn params(&self) -> ChatParams {
        ChatParams {
            temperature: self.temperature,
            top_p: self.top_p,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
        }
    }

    /// Validate request parameters before dispatch.
    ///
    /// Sonnet-family models only accept a temperature in [0, 1].
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.messages.is_empty() {
            return Err(GatewayError::InvalidParameter(
                "messages must not be empty".to_string(),
            ));
        }
        if self.model.contains("sonnet") && !(0.0..=1.0).contains(&self.temperature) {
            return Err(GatewayError::InvalidParameter(format!(
                "temperature must be between 0 and 1 for sonnet models, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}
