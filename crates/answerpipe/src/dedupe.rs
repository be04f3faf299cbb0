//! URL de-duplication and top-K selection.

use std::collections::HashSet;

use answerpipe_core::SearchResult;

/// Drops every hit whose URL was already seen, keeping first occurrences in
/// order. URLs compare as exact strings. The first hit for a URL also keeps
/// its metadata; later duplicates are discarded whole.
pub fn dedupe_by_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<String> = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

/// Dedupes, then keeps at most `top_k` hits.
pub fn dedupe_and_select(results: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
    let mut unique = dedupe_by_url(results);
    unique.truncate(top_k);
    unique
}
