//! Pipeline event vocabulary and stream aliases
//!
//! Wire adapters decode upstream SSE lines into [`SemanticEvent`]s; the
//! reasoning extractor normalizes them; the pipeline turns them into
//! OpenAI-shaped frames. All stages communicate through these types.

use std::convert::Infallible;
use std::pin::Pin;

use futures::Stream;

use crate::error::GatewayError;

/// A semantic event decoded from an upstream stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticEvent {
    /// Chain-of-thought text from the reasoning phase.
    Reasoning(String),
    /// User-facing answer text.
    Answer(String),
    /// The reasoning phase is over; no further `Reasoning` events follow
    /// from the same upstream call.
    EndOfReason,
    /// Terminal marker (`[DONE]` or an upstream end-of-message event).
    Done,
}

/// Parsed SSE events arriving from an upstream provider.
pub type SseEventStream =
    Pin<Box<dyn Stream<Item = Result<eventsource_stream::Event, GatewayError>> + Send>>;

/// Outgoing SSE frames, already encoded as `data: …\n\n` strings.
///
/// Errors are folded into terminal error frames before they reach this
/// stream, so the item error type is infallible and the frames can be fed
/// straight into an HTTP response body.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, Infallible>> + Send>>;
