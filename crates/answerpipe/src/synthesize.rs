//! Grounded answer synthesis.
//!
//! Builds one prompt from the enriched sources and asks the completion
//! backend for an answer constrained to them. Yields `None` on backend
//! failure or a blank reply; the caller decides how to surface that.

use answerpipe_core::{CompletionRequest, EnrichedResult, TextCompleter};

use crate::pipeline::PipelineConfig;

const SYNTHESIS_INSTRUCTION: &str = "Answer the user query based ONLY on the provided search \
results. Cite the sources if possible.";

/// One block per source: title, URL, snippet and scraped content when
/// present, separated by `---` lines, with the query up front.
pub(crate) fn build_prompt(query: &str, sources: &[EnrichedResult]) -> String {
    let mut context = String::new();
    for s in sources {
        let title = s.result.title.as_deref().unwrap_or("Untitled");
        context.push_str(&format!("Source: {title} ({})\n", s.result.url));
        if let Some(snippet) = &s.result.snippet {
            context.push_str(&format!("Description: {snippet}\n"));
        }
        if !s.content.is_empty() {
            context.push_str(&format!("Content: {}\n", s.content));
        }
        context.push_str("---\n");
    }
    format!("User Query: \"{query}\"\n\nSearch Results:\n{context}")
}

pub(crate) async fn synthesize(
    llm: &dyn TextCompleter,
    query: &str,
    sources: &[EnrichedResult],
    config: &PipelineConfig,
) -> Option<String> {
    let req = CompletionRequest {
        system: Some(SYNTHESIS_INSTRUCTION.to_string()),
        user: build_prompt(query, sources),
        timeout_ms: Some(config.llm_timeout_ms),
        max_tokens: config.llm_max_tokens,
        temperature: None,
    };
    match llm.complete(&req).await {
        Ok(reply) => {
            let trimmed = reply.trim();
            if trimmed.is_empty() {
                tracing::warn!(backend = llm.name(), "synthesis returned a blank reply");
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(err) => {
            tracing::warn!(backend = llm.name(), error = %err, "synthesis failed");
            None
        }
    }
}
