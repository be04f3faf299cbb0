//! Search fan-out.
//!
//! Runs every sub-query against the provider concurrently and flattens the
//! hits in sub-query order. `join_all` yields outcomes in input order, so the
//! flattened list is deterministic no matter which request finishes first.
//! A failed sub-query contributes nothing.

use answerpipe_core::{SearchProvider, SearchQuery, SearchResult};
use futures::future::join_all;

use crate::pipeline::PipelineConfig;

pub(crate) async fn search_all(
    provider: &dyn SearchProvider,
    sub_queries: &[String],
    config: &PipelineConfig,
) -> Vec<SearchResult> {
    let futures: Vec<_> = sub_queries
        .iter()
        .map(|sub| {
            let q = SearchQuery {
                query: sub.clone(),
                max_results: Some(config.results_per_query),
                timeout_ms: Some(config.search_timeout_ms),
            };
            async move {
                let outcome = provider.search(&q).await;
                (q.query, outcome)
            }
        })
        .collect();

    let mut hits = Vec::new();
    for (sub, outcome) in join_all(futures).await {
        match outcome {
            Ok(resp) => {
                tracing::debug!(
                    provider = provider.name(),
                    query = %sub,
                    count = resp.results.len(),
                    "sub-query returned hits"
                );
                hits.extend(
                    resp.results
                        .into_iter()
                        .take(config.results_per_query as usize),
                );
            }
            Err(err) => {
                tracing::warn!(
                    provider = provider.name(),
                    query = %sub,
                    error = %err,
                    "sub-query failed"
                );
            }
        }
    }
    hits
}
