//! OpenAI wire shapes emitted by the gateway
//!
//! Streaming `chat.completion.chunk` frames, the assembled `chat.completion`
//! object, the `/v1/models` listing, and the SSE framing helpers. A chunk
//! delta carries exactly one of `reasoning_content` or `content`.

use serde::Serialize;
use serde_json::json;

use crate::config::DeepModel;

/// Delta payload of a streaming chunk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

/// One `chat.completion.chunk` frame.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    fn with_delta(id: &str, created: i64, model: &str, delta: ChunkDelta) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason: None,
            }],
        }
    }

    /// Chunk carrying reasoning text.
    pub fn reasoning(id: &str, created: i64, model: &str, text: String) -> Self {
        Self::with_delta(
            id,
            created,
            model,
            ChunkDelta {
                role: Some("assistant".to_string()),
                reasoning_content: Some(text),
                ..Default::default()
            },
        )
    }

    /// Chunk carrying answer text.
    pub fn content(id: &str, created: i64, model: &str, text: String) -> Self {
        Self::with_delta(
            id,
            created,
            model,
            ChunkDelta {
                role: Some("assistant".to_string()),
                content: Some(text),
                ..Default::default()
            },
        )
    }

    /// Terminal chunk with `finish_reason = "stop"` and an empty delta.
    pub fn finish(id: &str, created: i64, model: &str) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta::default(),
                finish_reason: Some("stop".to_string()),
            }],
        }
    }
}

/// Assistant message of a non-streaming completion, carrying both the
/// concatenated reasoning and the concatenated answer.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionMessage {
    pub role: String,
    pub reasoning_content: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: String,
}

/// A complete `chat.completion` object.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
}

impl ChatCompletion {
    pub fn assembled(
        id: String,
        created: i64,
        model: &str,
        reasoning_content: String,
        content: String,
    ) -> Self {
        Self {
            id,
            object: "chat.completion".to_string(),
            created,
            model: model.to_string(),
            choices: vec![CompletionChoice {
                index: 0,
                message: CompletionMessage {
                    role: "assistant".to_string(),
                    reasoning_content,
                    content,
                },
                finish_reason: "stop".to_string(),
            }],
        }
    }
}

/// Fresh completion id in the OpenAI `chatcmpl-…` format.
pub fn new_completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/// Encode a serializable value as one SSE data frame.
pub fn sse_json_frame<T: Serialize>(value: &T) -> String {
    let payload = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    format!("data: {payload}\n\n")
}

/// The literal stream terminator.
pub fn sse_done_frame() -> String {
    "data: [DONE]\n\n".to_string()
}

/// Encode an error as a terminal SSE frame.
pub fn sse_error_frame(message: &str) -> String {
    sse_json_frame(&json!({ "error": message }))
}

/// `/v1/models` listing shapes.
#[derive(Debug, Clone, Serialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelEntry {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
    pub permission: Vec<ModelPermission>,
    pub root: String,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelPermission {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub allow_create_engine: bool,
    pub allow_sampling: bool,
    pub allow_logprobs: bool,
    pub allow_search_indices: bool,
    pub allow_view: bool,
    pub allow_fine_tuning: bool,
    pub organization: String,
    pub group: Option<String>,
    pub is_blocking: bool,
}

/// Build the model listing from the configured deep models, in load order.
pub fn model_list(deep_models: &[DeepModel]) -> ModelList {
    let created = chrono::Utc::now().timestamp();
    let data = deep_models
        .iter()
        .map(|deep| ModelEntry {
            id: deep.name.clone(),
            object: "model".to_string(),
            created,
            owned_by: "deepfuse".to_string(),
            permission: vec![ModelPermission {
                id: format!("modelperm-{}", deep.name),
                object: "model_permission".to_string(),
                created,
                allow_create_engine: false,
                allow_sampling: true,
                allow_logprobs: true,
                allow_search_indices: false,
                allow_view: true,
                allow_fine_tuning: false,
                organization: "*".to_string(),
                group: None,
                is_blocking: false,
            }],
            root: deep.name.clone(),
            parent: None,
        })
        .collect();
    ModelList {
        object: "list".to_string(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_chunk_carries_only_reasoning_content() {
        let chunk = ChatCompletionChunk::reasoning("chatcmpl-1", 1, "deepclaude", "hmm".into());
        let json = serde_json::to_value(&chunk).expect("serialize");
        assert_eq!(json["object"], "chat.completion.chunk");
        assert_eq!(json["choices"][0]["delta"]["reasoning_content"], "hmm");
        assert!(json["choices"][0]["delta"].get("content").is_none());
        assert!(json["choices"][0]["finish_reason"].is_null());
    }

    #[test]
    fn content_chunk_carries_only_content() {
        let chunk = ChatCompletionChunk::content("chatcmpl-1", 1, "deepclaude", "4".into());
        let json = serde_json::to_value(&chunk).expect("serialize");
        assert_eq!(json["choices"][0]["delta"]["content"], "4");
        assert!(json["choices"][0]["delta"].get("reasoning_content").is_none());
    }

    #[test]
    fn finish_chunk_sets_stop() {
        let chunk = ChatCompletionChunk::finish("chatcmpl-1", 1, "deepclaude");
        let json = serde_json::to_value(&chunk).expect("serialize");
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
        assert!(json["choices"][0]["delta"].get("content").is_none());
    }

    #[test]
    fn sse_frames_are_line_delimited() {
        let frame = sse_json_frame(&json!({"a": 1}));
        assert!(frame.starts_with("data: "));
        assert!(frame.ends_with("\n\n"));
        let payload: serde_json::Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim()).expect("valid json");
        assert_eq!(payload["a"], 1);
        assert_eq!(sse_done_frame(), "data: [DONE]\n\n");
    }

    #[test]
    fn completion_message_has_both_fields() {
        let completion = ChatCompletion::assembled(
            "chatcmpl-9".into(),
            7,
            "deepclaude",
            "thought".into(),
            "answer".into(),
        );
        let json = serde_json::to_value(&completion).expect("serialize");
        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["choices"][0]["message"]["reasoning_content"], "thought");
        assert_eq!(json["choices"][0]["message"]["content"], "answer");
        assert_eq!(json["choices"][0]["finish_reason"], "stop");
    }

    #[test]
    fn completion_ids_are_prefixed_and_unique() {
        let a = new_completion_id();
        let b = new_completion_id();
        assert!(a.starts_with("chatcmpl-"));
        assert_ne!(a, b);
    }
}
