//! OpenRouter adapter
//!
//! OpenRouter speaks the OpenAI dialect with two extra attribution headers,
//! and addresses Claude-family models by their `anthropic/…` route names.

use reqwest::header::{HeaderMap, HeaderValue};

use crate::config::{ProviderKind, UpstreamTarget};
use crate::error::GatewayError;
use crate::stream::SemanticEvent;
use crate::types::{ChatMessage, ChatParams};

use super::openai_compatible::{bearer_headers, chat_body, decode_openai_frame};
use super::{CallPhase, EncodedRequest, WireAdapter};

const HEADER_REFERER: &str = "HTTP-Referer";
const HEADER_TITLE: &str = "X-Title";
const REFERER: &str = "https://github.com/deepfuse/deepfuse";
const TITLE: &str = "deepfuse";

/// Route name OpenRouter expects for Claude-family answer models.
const CLAUDE_ROUTE: &str = "anthropic/claude-3.5-sonnet";

pub struct OpenRouterAdapter;

impl OpenRouterAdapter {
    /// Map Claude-family model ids onto OpenRouter's route name.
    ///
    /// Only answer calls are remapped; a reason model keeps its configured
    /// id even when it happens to be a Claude variant.
    fn route_model(model_id: &str, phase: CallPhase) -> &str {
        if phase == CallPhase::Answer && model_id.contains("claude") {
            CLAUDE_ROUTE
        } else {
            model_id
        }
    }
}

impl WireAdapter for OpenRouterAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenRouter
    }

    fn build_request(
        &self,
        target: &UpstreamTarget,
        messages: &[ChatMessage],
        params: ChatParams,
        phase: CallPhase,
        stream: bool,
        system_prompt: Option<&str>,
    ) -> Result<EncodedRequest, GatewayError> {
        let mut headers: HeaderMap = bearer_headers(&target.api_key)?;
        headers.insert(HEADER_REFERER, HeaderValue::from_static(REFERER));
        headers.insert(HEADER_TITLE, HeaderValue::from_static(TITLE));
        Ok(EncodedRequest {
            headers,
            body: chat_body(
                Self::route_model(&target.model_id, phase),
                messages,
                params,
                stream,
                system_prompt,
            ),
        })
    }

    fn decode_frame(&self, data: &str) -> Vec<SemanticEvent> {
        decode_openai_frame(data)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn target(model_id: &str) -> UpstreamTarget {
        UpstreamTarget {
            model_id: model_id.into(),
            base_url: "https://openrouter.ai/api/v1/chat/completions".into(),
            api_key: SecretString::from("sk-or"),
            kind: ProviderKind::OpenRouter,
            use_proxy: false,
        }
    }

    #[test]
    fn attribution_headers_are_set() {
        let request = OpenRouterAdapter
            .build_request(
                &target("openai/gpt-4o"),
                &[ChatMessage::user("hi")],
                ChatParams::default(),
                CallPhase::Answer,
                true,
                None,
            )
            .expect("build request");
        assert!(request.headers.contains_key(HEADER_REFERER));
        assert_eq!(
            request.headers.get(HEADER_TITLE).map(|v| v.to_str().ok()),
            Some(Some("deepfuse"))
        );
    }

    #[test]
    fn claude_answer_models_map_to_the_anthropic_route() {
        let request = OpenRouterAdapter
            .build_request(
                &target("claude-3-5-sonnet-20241022"),
                &[ChatMessage::user("hi")],
                ChatParams::default(),
                CallPhase::Answer,
                true,
                None,
            )
            .expect("build request");
        assert_eq!(request.body["model"], CLAUDE_ROUTE);
    }

    #[test]
    fn claude_reason_models_keep_their_configured_id() {
        let request = OpenRouterAdapter
            .build_request(
                &target("claude-3-5-sonnet-20241022"),
                &[ChatMessage::user("hi")],
                ChatParams::default(),
                CallPhase::Reason,
                true,
                None,
            )
            .expect("build request");
        assert_eq!(request.body["model"], "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn non_claude_models_pass_through() {
        let request = OpenRouterAdapter
            .build_request(
                &target("openai/gpt-4o"),
                &[ChatMessage::user("hi")],
                ChatParams::default(),
                CallPhase::Answer,
                true,
                None,
            )
            .expect("build request");
        assert_eq!(request.body["model"], "openai/gpt-4o");
    }
}
