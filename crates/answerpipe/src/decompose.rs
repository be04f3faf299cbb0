//! Query decomposition.
//!
//! Asks the completion backend to break the user query into a short list of
//! focused search queries. This stage never fails: a backend error or an
//! unusable reply falls back to searching the original query verbatim.

use answerpipe_core::{CompletionRequest, TextCompleter};

use crate::pipeline::PipelineConfig;

const DECOMPOSE_INSTRUCTION: &str = "You are a helpful assistant. Break down the user query into a \
list of 2-3 specific search queries that would help answer the original request comprehensively. \
Return ONLY the queries, one per line. No numbering or bullets. Do not wrap queries in double quotes.";

fn build_prompt(query: &str) -> String {
    format!("User Query: \"{query}\"")
}

/// Splits a reply into cleaned sub-queries: one per line, whitespace and
/// surrounding double quotes trimmed, empties dropped, capped at `max`.
/// Returns `None` when nothing usable remains.
pub(crate) fn parse_sub_queries(reply: &str, max: usize) -> Option<Vec<String>> {
    let out: Vec<String> = reply
        .lines()
        .map(|l| l.trim().trim_matches('"').trim().to_string())
        .filter(|l| !l.is_empty())
        .take(max)
        .collect();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

pub(crate) async fn decompose(
    llm: &dyn TextCompleter,
    query: &str,
    config: &PipelineConfig,
) -> Vec<String> {
    let req = CompletionRequest {
        system: Some(DECOMPOSE_INSTRUCTION.to_string()),
        user: build_prompt(query),
        timeout_ms: Some(config.llm_timeout_ms),
        max_tokens: config.llm_max_tokens,
        temperature: None,
    };
    match llm.complete(&req).await {
        Ok(reply) => match parse_sub_queries(&reply, config.max_sub_queries) {
            Some(qs) => {
                tracing::debug!(backend = llm.name(), count = qs.len(), "query decomposed");
                qs
            }
            None => {
                tracing::warn!(
                    backend = llm.name(),
                    "decomposition reply unusable, searching the original query"
                );
                vec![query.to_string()]
            }
        },
        Err(err) => {
            tracing::warn!(
                backend = llm.name(),
                error = %err,
                "decomposition failed, searching the original query"
            );
            vec![query.to_string()]
        }
    }
}
