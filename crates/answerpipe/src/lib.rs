//! Web-grounded answer pipeline.
//!
//! Takes one user query, decomposes it into focused sub-queries with a
//! completion backend, fans those out to a web search provider, de-duplicates
//! the hits by URL, scrapes the top pages, and synthesizes an answer grounded
//! in what was scraped.
//!
//! The pipeline is wired with the `answerpipe-core` traits, so any search
//! provider, fetcher or completion backend plugs in. HTTP-backed
//! implementations live in `answerpipe-local`.
//!
//! A run degrades instead of failing: a broken decomposition falls back to
//! searching the original query, failed sub-queries contribute no hits,
//! unreachable pages contribute empty content, and a failed synthesis yields
//! `None` for the answer.

pub use answerpipe_core::{
    CompletionRequest, EnrichedResult, Error, FetchBackend, FetchRequest, FetchResponse, Result,
    SearchProvider, SearchQuery, SearchResponse, SearchResult, TextCompleter,
};

mod decompose;
pub mod dedupe;
mod extract;
mod fanout;
mod pipeline;
mod scrape;
mod synthesize;

pub use pipeline::{Pipeline, PipelineConfig, PipelineRun};
