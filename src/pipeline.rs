//! Two-phase reason/answer pipeline
//!
//! The heart of the gateway. Phase 1 streams the reasoning model, pushing
//! every decoded delta through the extractor: reasoning text is buffered and
//! (when streaming) forwarded as `reasoning_content` chunks. Phase 2 appends
//! the buffered reasoning to the conversation inside a fixed envelope and
//! streams the answer model as `content` chunks. The two phases run
//! sequentially within a request; requests run concurrently.
//!
//! Failure policy: a phase-1 failure before any reasoning aborts the request
//! (error frame + `[DONE]` when streaming); a failure after partial
//! reasoning closes phase 1 and proceeds with what was captured; a phase-2
//! failure terminates the stream with an error frame. There are no retries
//! and no fallbacks between provider kinds.

use std::sync::Arc;

use futures_util::StreamExt;

use crate::client::UpstreamClient;
use crate::config::{ModelRegistry, ResolvedDeepModel, UpstreamTarget};
use crate::error::GatewayError;
use crate::protocol::{
    ChatCompletion, ChatCompletionChunk, new_completion_id, sse_done_frame, sse_error_frame,
    sse_json_frame,
};
use crate::reasoning::{ExtractionMode, ReasoningExtractor};
use crate::stream::{FrameStream, SemanticEvent};
use crate::types::{ChatMessage, ChatParams};
use crate::wire::{CallPhase, WireAdapter, adapter_for};

const ENVELOPE_PREFIX: &str = "Here is my reasoning process:\n<reasoning>\n";
const ENVELOPE_SUFFIX: &str = "\n</reasoning>\nBased on the above, please provide the answer.";

/// Drives deep-model completions over the upstream client.
#[derive(Clone)]
pub struct DeepPipeline {
    registry: Arc<ModelRegistry>,
    client: Arc<UpstreamClient>,
}

impl DeepPipeline {
    pub fn new(registry: Arc<ModelRegistry>, client: Arc<UpstreamClient>) -> Self {
        Self { registry, client }
    }

    /// Run the two-phase pipeline, emitting OpenAI-shaped SSE frames.
    ///
    /// The returned stream owns both upstream connections: dropping it (for
    /// example when the downstream client disconnects) cancels any in-flight
    /// upstream request.
    pub fn stream_completion(
        &self,
        deep_model: &str,
        messages: Vec<ChatMessage>,
        params: ChatParams,
    ) -> Result<FrameStream, GatewayError> {
        let resolved = self.registry.resolve(deep_model)?;
        let model_name = deep_model.to_string();
        let client = self.client.clone();

        let frames = async_stream::stream! {
            let completion_id = new_completion_id();
            let created = chrono::Utc::now().timestamp();

            // Phase 1: reason.
            let mut reasoning_buffer = String::new();
            let reason_adapter = adapter_for(resolved.reason.kind);
            let mut reason_events = match open_stream(
                &client,
                reason_adapter,
                &resolved.reason,
                &messages,
                params,
                CallPhase::Reason,
            )
            .await
            {
                Ok(events) => events,
                Err(e) => {
                    tracing::error!(error = %e, model = %model_name, "reason request failed");
                    yield Ok(sse_error_frame(&e.user_message()));
                    yield Ok(sse_done_frame());
                    return;
                }
            };

            let mut extractor =
                ReasoningExtractor::new(ExtractionMode::for_origin(resolved.is_origin_reasoning));
            let mut phase1_done = false;
            while !phase1_done {
                let batch = match reason_events.next().await {
                    Some(Ok(event)) => {
                        let mut out = Vec::new();
                        for semantic in reason_adapter.decode_frame(&event.data) {
                            out.extend(extractor.push(semantic));
                        }
                        out
                    }
                    Some(Err(e)) => {
                        if reasoning_buffer.is_empty() {
                            tracing::error!(error = %e, "reason stream failed before any reasoning");
                            yield Ok(sse_error_frame(&e.user_message()));
                            yield Ok(sse_done_frame());
                            return;
                        }
                        tracing::warn!(error = %e, "reason stream interrupted; keeping captured reasoning");
                        phase1_done = true;
                        extractor.finish()
                    }
                    // Upstream body closed without a terminal event.
                    None => {
                        phase1_done = true;
                        extractor.finish()
                    }
                };
                for event in batch {
                    match event {
                        SemanticEvent::Reasoning(text) => {
                            reasoning_buffer.push_str(&text);
                            yield Ok(sse_json_frame(&ChatCompletionChunk::reasoning(
                                &completion_id,
                                created,
                                &model_name,
                                text,
                            )));
                        }
                        SemanticEvent::EndOfReason | SemanticEvent::Done => {
                            phase1_done = true;
                        }
                        SemanticEvent::Answer(_) => {}
                    }
                }
            }
            drop(reason_events);

            // Phase 2: answer.
            let answer_messages = compose_answer_messages(&messages, &reasoning_buffer);
            let answer_adapter = adapter_for(resolved.answer.kind);
            let mut answer_events = match open_stream(
                &client,
                answer_adapter,
                &resolved.answer,
                &answer_messages,
                params,
                CallPhase::Answer,
            )
            .await
            {
                Ok(events) => events,
                Err(e) => {
                    tracing::error!(error = %e, model = %model_name, "answer request failed");
                    yield Ok(sse_error_frame(&e.user_message()));
                    yield Ok(sse_done_frame());
                    return;
                }
            };

            'answer: while let Some(item) = answer_events.next().await {
                match item {
                    Ok(event) => {
                        for semantic in answer_adapter.decode_frame(&event.data) {
                            match semantic {
                                SemanticEvent::Answer(text) if !text.is_empty() => {
                                    yield Ok(sse_json_frame(&ChatCompletionChunk::content(
                                        &completion_id,
                                        created,
                                        &model_name,
                                        text,
                                    )));
                                }
                                SemanticEvent::Done => break 'answer,
                                _ => {}
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "answer stream failed");
                        yield Ok(sse_error_frame(&e.user_message()));
                        yield Ok(sse_done_frame());
                        return;
                    }
                }
            }

            yield Ok(sse_json_frame(&ChatCompletionChunk::finish(
                &completion_id,
                created,
                &model_name,
            )));
            yield Ok(sse_done_frame());
        };

        let frames: FrameStream = Box::pin(frames);
        Ok(frames)
    }

    /// Run the two-phase pipeline and assemble a single completion object.
    pub async fn complete(
        &self,
        deep_model: &str,
        messages: Vec<ChatMessage>,
        params: ChatParams,
    ) -> Result<ChatCompletion, GatewayError> {
        let resolved = self.registry.resolve(deep_model)?;
        let completion_id = new_completion_id();
        let created = chrono::Utc::now().timestamp();

        let reasoning_buffer = self
            .collect_reasoning(&resolved, &messages, params)
            .await?;

        let answer_messages = compose_answer_messages(&messages, &reasoning_buffer);
        let answer_adapter = adapter_for(resolved.answer.kind);
        let mut answer_events = open_stream(
            &self.client,
            answer_adapter,
            &resolved.answer,
            &answer_messages,
            params,
            CallPhase::Answer,
        )
        .await?;

        let mut content = String::new();
        'answer: while let Some(item) = answer_events.next().await {
            for semantic in answer_adapter.decode_frame(&item?.data) {
                match semantic {
                    SemanticEvent::Answer(text) => content.push_str(&text),
                    SemanticEvent::Done => break 'answer,
                    _ => {}
                }
            }
        }

        Ok(ChatCompletion::assembled(
            completion_id,
            created,
            deep_model,
            reasoning_buffer,
            content,
        ))
    }

    /// Phase 1 of the non-streaming path: gather the reasoning buffer.
    async fn collect_reasoning(
        &self,
        resolved: &ResolvedDeepModel,
        messages: &[ChatMessage],
        params: ChatParams,
    ) -> Result<String, GatewayError> {
        let adapter = adapter_for(resolved.reason.kind);
        let mut events = open_stream(
            &self.client,
            adapter,
            &resolved.reason,
            messages,
            params,
            CallPhase::Reason,
        )
        .await?;
        let mut extractor =
            ReasoningExtractor::new(ExtractionMode::for_origin(resolved.is_origin_reasoning));
        let mut buffer = String::new();

        'reason: loop {
            let batch = match events.next().await {
                Some(Ok(event)) => {
                    let mut out = Vec::new();
                    for semantic in adapter.decode_frame(&event.data) {
                        out.extend(extractor.push(semantic));
                    }
                    out
                }
                Some(Err(e)) => {
                    if buffer.is_empty() {
                        return Err(e);
                    }
                    tracing::warn!(error = %e, "reason stream interrupted; keeping captured reasoning");
                    break 'reason;
                }
                None => {
                    for event in extractor.finish() {
                        if let SemanticEvent::Reasoning(text) = event {
                            buffer.push_str(&text);
                        }
                    }
                    break 'reason;
                }
            };
            for event in batch {
                match event {
                    SemanticEvent::Reasoning(text) => buffer.push_str(&text),
                    SemanticEvent::EndOfReason | SemanticEvent::Done => break 'reason,
                    SemanticEvent::Answer(_) => {}
                }
            }
        }
        Ok(buffer)
    }
}

/// Build and send one upstream streaming request.
async fn open_stream(
    client: &UpstreamClient,
    adapter: &'static dyn WireAdapter,
    target: &UpstreamTarget,
    messages: &[ChatMessage],
    params: ChatParams,
    phase: CallPhase,
) -> Result<crate::stream::SseEventStream, GatewayError> {
    let request = adapter.build_request(target, messages, params, phase, true, None)?;
    client
        .stream_sse(&target.base_url, request.headers, &request.body, target.use_proxy, None)
        .await
}

/// The caller's conversation plus the reasoning buffer in its fixed
/// envelope. The envelope appears exactly once, as a trailing user message.
pub(crate) fn compose_answer_messages(
    messages: &[ChatMessage],
    reasoning: &str,
) -> Vec<ChatMessage> {
    let mut out = messages.to_vec();
    out.push(ChatMessage::user(format!(
        "{ENVELOPE_PREFIX}{reasoning}{ENVELOPE_SUFFIX}"
    )));
    out
}
