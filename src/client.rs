//! Upstream streaming client
//!
//! Provider-agnostic streaming POST against an LLM endpoint. The response
//! body is parsed with `eventsource-stream` so UTF-8 boundaries and SSE
//! framing are handled uniformly regardless of provider; adapters only ever
//! see whole `data:` payloads.
//!
//! Keep-alive reuse is disabled: long-lived streaming endpoints routinely
//! drop idle connections and a stale pooled socket fails mid-stream.

use std::time::Duration;

use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::StreamExt;
use reqwest::header::HeaderMap;

use crate::error::GatewayError;
use crate::stream::SseEventStream;

const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(600);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(500);

/// Per-call deadlines applied to upstream requests.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamTimeouts {
    pub total: Duration,
    pub connect: Duration,
    pub read: Duration,
}

impl Default for UpstreamTimeouts {
    fn default() -> Self {
        Self {
            total: DEFAULT_TOTAL_TIMEOUT,
            connect: DEFAULT_CONNECT_TIMEOUT,
            read: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Streaming HTTP client shared by all upstream calls.
///
/// Two `reqwest` clients are built at startup: a direct one and, when
/// `PROXY_URL` is set, one routed through the forward proxy. Providers opt
/// into the proxy per call via `use_proxy`.
#[derive(Debug)]
pub struct UpstreamClient {
    direct: reqwest::Client,
    proxied: Option<reqwest::Client>,
}

impl UpstreamClient {
    /// Build a client with the default timeouts, reading `PROXY_URL` from
    /// the environment once.
    pub fn new() -> Result<Self, GatewayError> {
        Self::with_timeouts(UpstreamTimeouts::default())
    }

    /// Build a client with custom deadlines.
    pub fn with_timeouts(timeouts: UpstreamTimeouts) -> Result<Self, GatewayError> {
        let direct = build_client(timeouts, None)?;
        let proxied = match std::env::var("PROXY_URL") {
            Ok(url) if !url.trim().is_empty() => {
                tracing::info!(proxy = %url, "forward proxy configured");
                Some(build_client(timeouts, Some(&url))?)
            }
            _ => {
                tracing::info!("no forward proxy configured");
                None
            }
        };
        Ok(Self { direct, proxied })
    }

    /// POST a JSON body and stream the SSE response.
    ///
    /// A non-2xx status reads the whole error body and fails with
    /// `UpstreamHttp`. On success, the returned stream yields parsed SSE
    /// events as they arrive and ends when the server closes the body.
    /// Dropping the stream aborts the underlying connection.
    pub async fn stream_sse(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &serde_json::Value,
        use_proxy: bool,
        timeout: Option<Duration>,
    ) -> Result<SseEventStream, GatewayError> {
        let client = self.select_client(use_proxy);
        let mut request = client.post(url).headers(headers).json(body);
        if let Some(deadline) = timeout {
            request = request.timeout(deadline);
        }

        let response = request.send().await.map_err(GatewayError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %body, "upstream request failed");
            return Err(GatewayError::UpstreamHttp {
                status: status.as_u16(),
                body,
            });
        }

        let events = response.bytes_stream().eventsource().map(|item| {
            item.map_err(|e| match e {
                EventStreamError::Transport(transport) => GatewayError::from_transport(transport),
                other => GatewayError::Parse(other.to_string()),
            })
        });
        Ok(Box::pin(events))
    }

    fn select_client(&self, use_proxy: bool) -> &reqwest::Client {
        if !use_proxy {
            return &self.direct;
        }
        match &self.proxied {
            Some(client) => client,
            None => {
                tracing::warn!(
                    "provider requests a proxy but PROXY_URL is not set; continuing without proxy"
                );
                &self.direct
            }
        }
    }
}

fn build_client(
    timeouts: UpstreamTimeouts,
    proxy_url: Option<&str>,
) -> Result<reqwest::Client, GatewayError> {
    let mut builder = reqwest::Client::builder()
        .timeout(timeouts.total)
        .connect_timeout(timeouts.connect)
        .read_timeout(timeouts.read)
        .pool_max_idle_per_host(0);
    if let Some(url) = proxy_url {
        let proxy = reqwest::Proxy::all(url)
            .map_err(|e| GatewayError::Configuration(format!("invalid PROXY_URL '{url}': {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| GatewayError::Configuration(format!("cannot build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_match_contract() {
        let t = UpstreamTimeouts::default();
        assert_eq!(t.total, Duration::from_secs(600));
        assert_eq!(t.connect, Duration::from_secs(10));
        assert_eq!(t.read, Duration::from_secs(500));
    }

    #[test]
    fn proxyless_client_falls_back_to_direct() {
        let client = UpstreamClient {
            direct: reqwest::Client::new(),
            proxied: None,
        };
        // Both selections must resolve to a usable client.
        let _ = client.select_client(false);
        let _ = client.select_client(true);
    }
}
