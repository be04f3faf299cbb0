//! HTTP-backed implementations of the answerpipe capability traits.
//!
//! [`HttpFetcher`] fetches pages with reqwest. [`search`] holds the web
//! search providers (Brave, Tavily, SearXNG). [`openai_compat`] and
//! [`gemini`] hold the text completion backends. All constructors take a
//! shared [`reqwest::Client`] so one connection pool serves every
//! collaborator.

pub mod gemini;
pub mod openai_compat;
pub mod search;

use answerpipe_core::{Error, FetchBackend, FetchRequest, FetchResponse, Result};
use async_trait::async_trait;

/// Browser-like user agent. Some hosts serve stripped or empty pages to
/// obvious bot agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const DEFAULT_MAX_BYTES: u64 = 2_000_000;

/// Reads an env var, treating unset, empty and whitespace-only as absent.
pub(crate) fn env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Fetches URLs over HTTP(S) with a body byte cap and per-request timeouts.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a fetcher with its own client: browser user agent, bounded
    /// redirects, connect and total timeouts.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchBackend for HttpFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let url = url::Url::parse(&req.url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", req.url)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::InvalidUrl(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }
        let max_bytes = req.max_bytes.unwrap_or(DEFAULT_MAX_BYTES) as usize;

        let resp = self
            .client
            .get(url)
            .timeout(req.timeout())
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        // Stream the body so oversized pages stop at the cap instead of
        // buffering whole.
        use futures_util::StreamExt;
        let mut bytes: Vec<u8> = Vec::new();
        let mut truncated = false;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Fetch(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > max_bytes {
                let take = max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..take]);
                truncated = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchResponse {
            url: req.url.clone(),
            final_url,
            status,
            content_type,
            bytes,
            truncated,
        })
    }
}
