//! Bounded scraping of selected hits.
//!
//! Pages are fetched concurrently with a short per-page timeout and a body
//! byte cap, then reduced to collapsed plain text capped per source. A page
//! that fails, times out or answers non-2xx contributes empty content; the
//! hit itself is kept so synthesis still sees its title and snippet.

use answerpipe_core::{EnrichedResult, FetchBackend, FetchRequest, SearchResult};
use futures::future::join_all;

use crate::extract;
use crate::pipeline::PipelineConfig;

pub(crate) async fn scrape_all(
    fetcher: &dyn FetchBackend,
    selected: Vec<SearchResult>,
    config: &PipelineConfig,
) -> Vec<EnrichedResult> {
    let futures: Vec<_> = selected
        .into_iter()
        .map(|result| async move {
            let content = scrape_one(fetcher, &result.url, config).await;
            EnrichedResult { result, content }
        })
        .collect();
    join_all(futures).await
}

async fn scrape_one(fetcher: &dyn FetchBackend, url: &str, config: &PipelineConfig) -> String {
    let req = FetchRequest {
        url: url.to_string(),
        timeout_ms: Some(config.scrape_timeout_ms),
        max_bytes: Some(config.scrape_max_bytes),
    };
    match fetcher.fetch(&req).await {
        Ok(resp) if resp.is_success() => {
            let (text, truncated) = extract::page_text(&resp.text_lossy(), config.content_max_chars);
            tracing::debug!(url, chars = text.chars().count(), truncated, "page scraped");
            text
        }
        Ok(resp) => {
            tracing::warn!(url, status = resp.status, "scrape got a non-success status");
            String::new()
        }
        Err(err) => {
            tracing::warn!(url, error = %err, "scrape failed");
            String::new()
        }
    }
}
