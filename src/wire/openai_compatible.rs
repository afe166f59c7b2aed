//! OpenAI-compatible adapter
//!
//! Covers DeepSeek-style reasoning providers and any other endpoint speaking
//! the OpenAI chat-completions SSE dialect. Deltas may carry either a plain
//! `content` field or a dedicated `reasoning_content` field.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::config::{ProviderKind, UpstreamTarget};
use crate::error::GatewayError;
use crate::stream::SemanticEvent;
use crate::types::{ChatMessage, ChatParams};

use super::{CallPhase, EncodedRequest, WireAdapter, clamp_temperature, with_system_prompt};

pub struct OpenAiCompatibleAdapter;

impl WireAdapter for OpenAiCompatibleAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAICompatible
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
        Ok(EncodedRequest {
            headers: bearer_headers(&target.api_key)?,
            body: chat_body(&target.model_id, messages, params, stream, system_prompt),
        })
    }

    fn decode_frame(&self, data: &str) -> Vec<SemanticEvent> {
        decode_openai_frame(data)
    }
}

/// Standard headers for Bearer-authenticated OpenAI-style endpoints.
pub(crate) fn bearer_headers(api_key: &SecretString) -> Result<HeaderMap, GatewayError> {
    let mut headers = HeaderMap::new();
    let bearer = format!("Bearer {}", api_key.expose_secret());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&bearer)
            .map_err(|e| GatewayError::Configuration(format!("invalid API key: {e}")))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    Ok(headers)
}

/// OpenAI-shaped chat body shared with the OpenRouter adapter.
pub(crate) fn chat_body(
    model_id: &str,
    messages: &[ChatMessage],
    params: ChatParams,
    stream: bool,
    system_prompt: Option<&str>,
) -> serde_json::Value {
    json!({
        "model": model_id,
        "messages": with_system_prompt(messages, system_prompt),
        "stream": stream,
        "temperature": clamp_temperature(params.temperature),
        "top_p": params.top_p,
        "presence_penalty": params.presence_penalty,
        "frequency_penalty": params.frequency_penalty,
    })
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

/// Decode one OpenAI-style SSE payload.
pub(crate) fn decode_openai_frame(data: &str) -> Vec<SemanticEvent> {
    if data.trim() == "[DONE]" {
        return vec![SemanticEvent::Done];
    }
    let event: StreamEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, payload = %data, "dropping undecodable SSE payload");
            return vec![];
        }
    };
    let Some(delta) = event.choices.into_iter().next().and_then(|c| c.delta) else {
        return vec![];
    };
    if let Some(reasoning) = delta.reasoning_content
        && !reasoning.is_empty()
    {
        return vec![SemanticEvent::Reasoning(reasoning)];
    }
    if let Some(content) = delta.content
        && !content.is_empty()
    {
        return vec![SemanticEvent::Answer(content)];
    }
    vec![]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> UpstreamTarget {
        UpstreamTarget {
            model_id: "deepseek-reasoner".into(),
            base_url: "https://api.deepseek.com/v1/chat/completions".into(),
            api_key: SecretString::from("sk-test"),
            kind: ProviderKind::OpenAICompatible,
            use_proxy: false,
        }
    }

    #[test]
    fn request_carries_bearer_auth_and_sampling_params() {
        let request = OpenAiCompatibleAdapter
            .build_request(
                &target(),
                &[ChatMessage::user("2+2?")],
                ChatParams::default(),
                CallPhase::Reason,
                true,
                None,
            )
            .expect("build request");
        assert_eq!(
            request.headers.get(AUTHORIZATION).map(|v| v.to_str().ok()),
            Some(Some("Bearer sk-test"))
        );
        assert_eq!(
            request.headers.get(ACCEPT).map(|v| v.to_str().ok()),
            Some(Some("text/event-stream"))
        );
        assert_eq!(request.body["model"], "deepseek-reasoner");
        assert_eq!(request.body["stream"], true);
        assert_eq!(request.body["temperature"], 0.5);
        assert_eq!(request.body["messages"][0]["role"], "user");
    }

    #[test]
    fn out_of_range_temperature_falls_back_to_one() {
        let params = ChatParams {
            temperature: 1.7,
            ..Default::default()
        };
        let request = OpenAiCompatibleAdapter
            .build_request(
                &target(),
                &[ChatMessage::user("hi")],
                params,
                CallPhase::Reason,
                true,
                None,
            )
            .expect("build request");
        assert_eq!(request.body["temperature"], 1.0);
    }

    #[test]
    fn system_prompt_becomes_leading_system_message() {
        let request = OpenAiCompatibleAdapter
            .build_request(
                &target(),
                &[ChatMessage::user("hi")],
                ChatParams::default(),
                CallPhase::Answer,
                true,
                Some("be brief"),
            )
            .expect("build request");
        assert_eq!(request.body["messages"][0]["role"], "system");
        assert_eq!(request.body["messages"][0]["content"], "be brief");
        assert_eq!(request.body["messages"][1]["role"], "user");
    }

    #[test]
    fn reasoning_content_decodes_to_reasoning() {
        let events = decode_openai_frame(
            r#"{"choices":[{"delta":{"reasoning_content":"Two plus two"}}]}"#,
        );
        assert_eq!(
            events,
            vec![SemanticEvent::Reasoning("Two plus two".into())]
        );
    }

    #[test]
    fn content_decodes_to_answer() {
        let events = decode_openai_frame(r#"{"choices":[{"delta":{"content":"4"}}]}"#);
        assert_eq!(events, vec![SemanticEvent::Answer("4".into())]);
    }

    #[test]
    fn done_sentinel_decodes_to_done() {
        assert_eq!(decode_openai_frame("[DONE]"), vec![SemanticEvent::Done]);
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        assert!(decode_openai_frame("{not json").is_empty());
        assert!(decode_openai_frame(r#"{"choices":[]}"#).is_empty());
        assert!(decode_openai_frame(r#"{"choices":[{"delta":{"content":""}}]}"#).is_empty());
    }
}
