//! Gateway error types
//!
//! A single error enum shared by the config registry, the upstream client,
//! the wire adapters and the HTTP surface. Decode errors on individual SSE
//! lines are not represented here because they are logged and dropped at the
//! adapter level; everything else aborts the current request.

use axum::http::StatusCode;

/// Unified error type for the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed or inconsistent configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested deep model is not defined.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// A request parameter is outside its allowed range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Bearer token mismatch.
    #[error("unauthorized")]
    Unauthorized,

    /// Upstream provider answered with a non-2xx status.
    #[error("upstream HTTP {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    /// Connect/read/total deadline exceeded against an upstream.
    #[error("upstream timeout: {0}")]
    Timeout(String),

    /// Socket-level failure talking to an upstream.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed SSE or JSON received from an upstream.
    #[error("parse error: {0}")]
    Parse(String),

    /// The request was canceled before completion.
    #[error("request canceled: {0}")]
    Canceled(String),

    /// Anything that should never surface to a client verbatim.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status the server layer should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownModel(_) | Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::UpstreamHttp { .. } | Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Configuration(_) | Self::Parse(_) | Self::Canceled(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message suitable for a client-facing error body.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Classify a `reqwest` failure into a timeout or a transport error.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}
