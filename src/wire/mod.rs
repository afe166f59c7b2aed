//! Per-provider wire adapters
//!
//! Each [`ProviderKind`] owns exactly one adapter: the sole legal encoder of
//! request bodies/headers and decoder of SSE payloads for that provider's
//! traffic. Malformed upstream lines are logged and dropped here — a single
//! bad frame never kills a stream.

pub mod anthropic;
pub mod openai_compatible;
pub mod openrouter;

use reqwest::header::HeaderMap;

use crate::config::{ProviderKind, UpstreamTarget};
use crate::error::GatewayError;
use crate::stream::SemanticEvent;
use crate::types::{ChatMessage, ChatParams};

pub use anthropic::AnthropicAdapter;
pub use openai_compatible::OpenAiCompatibleAdapter;
pub use openrouter::OpenRouterAdapter;

/// An encoded upstream request: headers plus JSON body.
#[derive(Debug)]
pub struct EncodedRequest {
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// Which pipeline phase a request is built for.
///
/// Most adapters encode both phases identically; OpenRouter remaps
/// Claude-family model ids on the answer side only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Reason,
    Answer,
}

/// Encoder/decoder for one provider wire format.
pub trait WireAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Build the upstream request for a chat call.
    fn build_request(
        &self,
        target: &UpstreamTarget,
        messages: &[ChatMessage],
        params: ChatParams,
        phase: CallPhase,
        stream: bool,
        system_prompt: Option<&str>,
    ) -> Result<EncodedRequest, GatewayError>;

    /// Decode one SSE data payload into zero or one semantic events.
    ///
    /// `[DONE]` decodes to [`SemanticEvent::Done`]; undecodable payloads
    /// are logged and yield nothing.
    fn decode_frame(&self, data: &str) -> Vec<SemanticEvent>;
}

/// The adapter owning a provider kind's traffic.
pub fn adapter_for(kind: ProviderKind) -> &'static dyn WireAdapter {
    match kind {
        ProviderKind::Anthropic => &AnthropicAdapter,
        ProviderKind::OpenRouter => &OpenRouterAdapter,
        ProviderKind::OpenAICompatible => &OpenAiCompatibleAdapter,
    }
}

/// Clamp a requested temperature into the providers' accepted range.
///
/// Values outside [0, 1] fall back to 1.
pub(crate) fn clamp_temperature(temperature: f32) -> f32 {
    if (0.0..=1.0).contains(&temperature) {
        temperature
    } else {
        1.0
    }
}

/// Messages with an optional system prompt prepended.
pub(crate) fn with_system_prompt(
    messages: &[ChatMessage],
    system_prompt: Option<&str>,
) -> Vec<ChatMessage> {
    match system_prompt {
        Some(prompt) => {
            let mut out = Vec::with_capacity(messages.len() + 1);
            out.push(ChatMessage::system(prompt));
            out.extend(messages.iter().cloned());
            out
        }
        None => messages.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapters_cover_every_kind() {
        for kind in [
            ProviderKind::Anthropic,
            ProviderKind::OpenRouter,
            ProviderKind::OpenAICompatible,
        ] {
            assert_eq!(adapter_for(kind).kind(), kind);
        }
    }

    #[test]
    fn temperature_clamps_to_default_outside_range() {
        assert_eq!(clamp_temperature(0.7), 0.7);
        assert_eq!(clamp_temperature(0.0), 0.0);
        assert_eq!(clamp_temperature(1.0), 1.0);
        assert_eq!(clamp_temperature(1.5), 1.0);
        assert_eq!(clamp_temperature(-0.1), 1.0);
    }

    #[test]
    fn system_prompt_is_prepended() {
        let messages = vec![ChatMessage::user("hi")];
        let with = with_system_prompt(&messages, Some("be terse"));
        assert_eq!(with.len(), 2);
        assert_eq!(with[0], ChatMessage::system("be terse"));
        assert_eq!(with[1], messages[0]);
        assert_eq!(with_system_prompt(&messages, None), messages);
    }
}
