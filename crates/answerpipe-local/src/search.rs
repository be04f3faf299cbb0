//! Web search providers.
//!
//! Each provider is a thin client over one HTTP search API. Construction via
//! `from_env` fails with [`Error::NotConfigured`] naming the variables to
//! set; a live `search` maps transport and decode failures to
//! [`Error::Search`]. Providers truncate their own output to the requested
//! `max_results`, whatever the API returns.

use answerpipe_core::{Error, Result, SearchProvider, SearchQuery, SearchResponse, SearchResult};
use async_trait::async_trait;
use serde::Deserialize;

use crate::env;

fn api_key(primary: &str, fallback: &str) -> Option<String> {
    env(primary).or_else(|| env(fallback))
}

fn result_count(q: &SearchQuery) -> u32 {
    q.max_results.unwrap_or(5).clamp(1, 20)
}

const BRAVE_DEFAULT_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";
const TAVILY_DEFAULT_ENDPOINT: &str = "https://api.tavily.com/search";

/// Brave Search API client.
#[derive(Debug)]
pub struct BraveSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl BraveSearch {
    /// Reads `ANSWERPIPE_BRAVE_API_KEY` (fallback `BRAVE_SEARCH_API_KEY`).
    /// `ANSWERPIPE_BRAVE_ENDPOINT` overrides the API endpoint.
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = api_key("ANSWERPIPE_BRAVE_API_KEY", "BRAVE_SEARCH_API_KEY")
            .ok_or_else(|| {
                Error::NotConfigured(
                    "set ANSWERPIPE_BRAVE_API_KEY or BRAVE_SEARCH_API_KEY".into(),
                )
            })?;
        let endpoint = env("ANSWERPIPE_BRAVE_ENDPOINT")
            .unwrap_or_else(|| BRAVE_DEFAULT_ENDPOINT.to_string());
        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BraveWebResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResults {
    results: Option<Vec<BraveWebResult>>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResult {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
}

#[async_trait]
impl SearchProvider for BraveSearch {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let count = result_count(q);
        let count_s = count.to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", q.query.as_str()), ("count", count_s.as_str())])
            .header("X-Subscription-Token", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(q.timeout())
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::Search(format!(
                "brave: http {}",
                resp.status().as_u16()
            )));
        }
        let body: BraveWebResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let results = body
            .web
            .and_then(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| {
                let url = r.url?;
                Some(SearchResult {
                    url,
                    title: r.title,
                    snippet: r.description,
                    source: Some("brave".into()),
                })
            })
            .take(count as usize)
            .collect();
        Ok(SearchResponse {
            results,
            provider: "brave".into(),
        })
    }
}

/// Tavily Search API client.
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl TavilySearch {
    /// Reads `ANSWERPIPE_TAVILY_API_KEY` (fallback `TAVILY_API_KEY`).
    /// `ANSWERPIPE_TAVILY_ENDPOINT` overrides the API endpoint.
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = api_key("ANSWERPIPE_TAVILY_API_KEY", "TAVILY_API_KEY").ok_or_else(|| {
            Error::NotConfigured("set ANSWERPIPE_TAVILY_API_KEY or TAVILY_API_KEY".into())
        })?;
        let endpoint = env("ANSWERPIPE_TAVILY_ENDPOINT")
            .unwrap_or_else(|| TAVILY_DEFAULT_ENDPOINT.to_string());
        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Option<Vec<TavilyResult>>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: Option<String>,
    url: Option<String>,
    content: Option<String>,
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let count = result_count(q);
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "api_key": self.api_key,
                "query": q.query,
                "max_results": count,
            }))
            .timeout(q.timeout())
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::Search(format!(
                "tavily: http {}",
                resp.status().as_u16()
            )));
        }
        let body: TavilyResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let results = body
            .results
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| {
                let url = r.url?;
                Some(SearchResult {
                    url,
                    title: r.title,
                    snippet: r.content,
                    source: Some("tavily".into()),
                })
            })
            .take(count as usize)
            .collect();
        Ok(SearchResponse {
            results,
            provider: "tavily".into(),
        })
    }
}

/// Client for a SearXNG instance with the JSON format enabled.
pub struct SearxngSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl SearxngSearch {
    /// Reads `ANSWERPIPE_SEARXNG_ENDPOINT` (fallback `SEARXNG_ENDPOINT`),
    /// the instance base URL.
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let endpoint = env("ANSWERPIPE_SEARXNG_ENDPOINT")
            .or_else(|| env("SEARXNG_ENDPOINT"))
            .ok_or_else(|| {
                Error::NotConfigured(
                    "set ANSWERPIPE_SEARXNG_ENDPOINT or SEARXNG_ENDPOINT to a SearXNG base URL"
                        .into(),
                )
            })?;
        Ok(Self { client, endpoint })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.endpoint.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    results: Option<Vec<SearxngResult>>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    title: Option<String>,
    url: Option<String>,
    content: Option<String>,
}

#[async_trait]
impl SearchProvider for SearxngSearch {
    fn name(&self) -> &'static str {
        "searxng"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let count = result_count(q);
        let resp = self
            .client
            .get(self.search_url())
            .query(&[("q", q.query.as_str()), ("format", "json")])
            .timeout(q.timeout())
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::Search(format!(
                "searxng: http {}",
                resp.status().as_u16()
            )));
        }
        let body: SearxngResponse = resp
            .json()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let results = body
            .results
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| {
                let url = r.url?;
                Some(SearchResult {
                    url,
                    title: r.title,
                    snippet: r.content,
                    source: Some("searxng".into()),
                })
            })
            .take(count as usize)
            .collect();
        Ok(SearchResponse {
            results,
            provider: "searxng".into(),
        })
    }
}
