//! Shared data model and capability traits for answerpipe. No IO here.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A request to fetch one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Per-request timeout in milliseconds. `None` means the default.
    pub timeout_ms: Option<u64>,
    /// Cap on body bytes read. `None` means the backend default.
    pub max_bytes: Option<u64>,
}

impl FetchRequest {
    /// Effective timeout, clamped to a sane range.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(20_000).clamp(1_000, 120_000))
    }
}

/// A fetched page body plus transport metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    /// The URL that was requested.
    pub url: String,
    /// The URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    /// True when the body was cut off at the byte cap.
    pub truncated: bool,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }
}

/// One web search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    /// Upper bound on returned hits. `None` means the provider default.
    pub max_results: Option<u32>,
    pub timeout_ms: Option<u64>,
}

impl SearchQuery {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(20_000).clamp(1_000, 60_000))
    }
}

/// One hit returned by a search provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
    /// Name of the provider that produced this hit.
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub provider: String,
}

/// A request for a single text completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Optional instruction sent ahead of the user prompt.
    pub system: Option<String>,
    pub user: String,
    pub timeout_ms: Option<u64>,
    pub max_tokens: Option<u64>,
    pub temperature: Option<f64>,
}

impl CompletionRequest {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(30_000).clamp(1_000, 120_000))
    }
}

/// A selected search hit paired with the text scraped from its page.
///
/// `content` is empty when the scrape failed or the page had no usable text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub result: SearchResult,
    pub content: String,
}

/// Fetches URLs over some transport.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

/// A web search provider.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short name used in logs and result attribution.
    fn name(&self) -> &'static str;
    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse>;
}

/// A text completion backend.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;
    async fn complete(&self, req: &CompletionRequest) -> Result<String>;
}
