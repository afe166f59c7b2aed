//! Anthropic native adapter
//!
//! The Messages API takes `x-api-key` auth, carries the system prompt in a
//! dedicated `system` field and streams typed events; answer text arrives in
//! `content_block_delta` events. There is no `[DONE]` sentinel — the stream
//! ends with `message_stop` or when the body closes.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

use crate::config::{ProviderKind, UpstreamTarget};
use crate::error::GatewayError;
use crate::stream::SemanticEvent;
use crate::types::{ChatMessage, ChatParams};

use super::{CallPhase, EncodedRequest, WireAdapter, clamp_temperature};

const HEADER_API_KEY: &str = "x-api-key";
const HEADER_VERSION: &str = "anthropic-version";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8192;

pub struct AnthropicAdapter;

impl WireAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn build_request(
        &self,
        target: &UpstreamTarget,
        messages: &[ChatMessage],
        params: ChatParams,
        _phase: CallPhase,
        stream: bool,
        system_prompt: Option<&str>,
    ) -> Result<EncodedRequest, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HEADER_API_KEY,
            HeaderValue::from_str(target.api_key.expose_secret())
                .map_err(|e| GatewayError::Configuration(format!("invalid API key: {e}")))?,
        );
        headers.insert(HEADER_VERSION, HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let mut body = json!({
            "model": target.model_id,
            "messages": messages,
            "max_tokens": MAX_TOKENS,
            "stream": stream,
            "temperature": clamp_temperature(params.temperature),
            "top_p": params.top_p,
        });
        if let Some(prompt) = system_prompt {
            body["system"] = json!(prompt);
        }

        Ok(EncodedRequest { headers, body })
    }

    fn decode_frame(&self, data: &str) -> Vec<SemanticEvent> {
        let event: AnthropicStreamEvent = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, payload = %data, "dropping undecodable SSE payload");
                return vec![];
            }
        };
        match event.r#type.as_str() {
            "content_block_delta" => match event.delta.and_then(|d| d.text) {
                Some(text) if !text.is_empty() => vec![SemanticEvent::Answer(text)],
                _ => vec![],
            },
            "message_stop" => vec![SemanticEvent::Done],
            _ => vec![],
        }
    }
}

/// Tolerant view of the Anthropic SSE event family; unknown event types and
/// fields are ignored rather than failing the stream.
#[derive(Debug, Deserialize)]
struct AnthropicStreamEvent {
    r#type: String,
    #[serde(default)]
    delta: Option<AnthropicDelta>,
}

#[derive(Debug, Deserialize)]
struct AnthropicDelta {
    #[serde(default)]
    text: Option<String>,
}
