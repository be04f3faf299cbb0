//! The answer pipeline.

use std::sync::Arc;

use answerpipe_core::{EnrichedResult, FetchBackend, SearchProvider, SearchResult, TextCompleter};
use serde::Serialize;

use crate::{decompose, dedupe, fanout, scrape, synthesize};

/// Tuning knobs for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Hits requested per sub-query.
    pub results_per_query: u32,
    /// Sources kept after de-duplication and handed to the scraper.
    pub top_sources: usize,
    /// Upper bound on sub-queries taken from decomposition.
    pub max_sub_queries: usize,
    pub search_timeout_ms: u64,
    /// Per-page scrape timeout.
    pub scrape_timeout_ms: u64,
    pub scrape_max_bytes: u64,
    /// Per-source content cap, in characters.
    pub content_max_chars: usize,
    pub llm_timeout_ms: u64,
    pub llm_max_tokens: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            results_per_query: 2,
            top_sources: 3,
            max_sub_queries: 5,
            search_timeout_ms: 10_000,
            scrape_timeout_ms: 5_000,
            scrape_max_bytes: 2_000_000,
            content_max_chars: 2_000,
            llm_timeout_ms: 30_000,
            llm_max_tokens: None,
        }
    }
}

/// Everything one run produced, alongside the final answer.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub query: String,
    /// What was actually searched. Falls back to the original query when
    /// decomposition produced nothing usable.
    pub sub_queries: Vec<String>,
    /// All distinct hits across sub-queries, in discovery order.
    pub results: Vec<SearchResult>,
    /// The selected hits that were scraped and handed to synthesis.
    pub sources: Vec<EnrichedResult>,
    /// `None` when synthesis failed or produced nothing.
    pub answer: Option<String>,
}

/// Wires a search provider, a fetcher and a completion backend into the
/// decompose / search / select / scrape / synthesize sequence.
pub struct Pipeline {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn FetchBackend>,
    llm: Arc<dyn TextCompleter>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn FetchBackend>,
        llm: Arc<dyn TextCompleter>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            search,
            fetcher,
            llm,
            config,
        }
    }

    /// Runs the full pipeline for one query.
    ///
    /// Never fails: every stage degrades on error, so the worst case is a
    /// run with empty results and `answer: None`.
    pub async fn run(&self, query: &str) -> PipelineRun {
        let sub_queries = decompose::decompose(self.llm.as_ref(), query, &self.config).await;

        let hits = fanout::search_all(self.search.as_ref(), &sub_queries, &self.config).await;

        let results = dedupe::dedupe_by_url(hits);
        let selected: Vec<SearchResult> = results
            .iter()
            .take(self.config.top_sources)
            .cloned()
            .collect();
        tracing::debug!(
            distinct = results.len(),
            selected = selected.len(),
            "hits selected"
        );

        let sources = scrape::scrape_all(self.fetcher.as_ref(), selected, &self.config).await;

        let answer = synthesize::synthesize(self.llm.as_ref(), query, &sources, &self.config).await;

        PipelineRun {
            query: query.to_string(),
            sub_queries,
            results,
            sources,
            answer,
        }
    }

    /// Runs the pipeline and returns only the answer.
    pub async fn answer_with_web_search(&self, query: &str) -> Option<String> {
        self.run(query).await.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use answerpipe_core::{
        CompletionRequest, Error, FetchRequest, FetchResponse, Result, SearchQuery, SearchResponse,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedLlm {
        replies: Mutex<Vec<Result<String>>>,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextCompleter for ScriptedLlm {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn complete(&self, req: &CompletionRequest) -> Result<String> {
            self.calls.lock().unwrap().push(req.clone());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(String::new())
            } else {
                replies.remove(0)
            }
        }
    }

    struct MapSearch {
        hits: HashMap<String, Vec<SearchResult>>,
    }

    #[async_trait]
    impl SearchProvider for MapSearch {
        fn name(&self) -> &'static str {
            "map"
        }

        async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
            match self.hits.get(&q.query) {
                Some(results) => Ok(SearchResponse {
                    results: results.clone(),
                    provider: "map".into(),
                }),
                None => Err(Error::Search(format!("no fixture for {}", q.query))),
            }
        }
    }

    struct MapFetcher {
        pages: HashMap<String, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FetchBackend for MapFetcher {
        async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(&req.url) {
                Some(body) => Ok(FetchResponse {
                    url: req.url.clone(),
                    final_url: req.url.clone(),
                    status: 200,
                    content_type: Some("text/html".into()),
                    bytes: body.clone().into_bytes(),
                    truncated: false,
                }),
                None => Err(Error::Fetch("unreachable".into())),
            }
        }
    }

    fn hit(url: &str, title: &str) -> SearchResult {
        SearchResult {
            url: url.into(),
            title: Some(title.into()),
            snippet: Some(format!("snippet for {title}")),
            source: Some("map".into()),
        }
    }

    fn pipeline(
        hits: HashMap<String, Vec<SearchResult>>,
        pages: HashMap<String, String>,
        replies: Vec<Result<String>>,
    ) -> (Pipeline, Arc<ScriptedLlm>, Arc<MapFetcher>) {
        let llm = Arc::new(ScriptedLlm::new(replies));
        let fetcher = Arc::new(MapFetcher {
            pages,
            calls: AtomicUsize::new(0),
        });
        let p = Pipeline::new(
            Arc::new(MapSearch { hits }),
            fetcher.clone(),
            llm.clone(),
            PipelineConfig::default(),
        );
        (p, llm, fetcher)
    }

    #[tokio::test]
    async fn a_full_run_collects_sources_and_an_answer() {
        let mut hits = HashMap::new();
        hits.insert(
            "q1".to_string(),
            vec![hit("https://e.com/a", "A"), hit("https://e.com/b", "B")],
        );
        hits.insert(
            "q2".to_string(),
            vec![hit("https://e.com/a", "A again"), hit("https://e.com/c", "C")],
        );
        let mut pages = HashMap::new();
        pages.insert("https://e.com/a".to_string(), "<p>apple facts</p>".to_string());
        pages.insert("https://e.com/b".to_string(), "<p>banana facts</p>".to_string());
        // /c is unreachable on purpose.

        let (p, llm, _fetcher) = pipeline(
            hits,
            pages,
            vec![Ok("q1\nq2".into()), Ok("grounded answer".into())],
        );
        let run = p.run("fruit?").await;

        assert_eq!(run.sub_queries, vec!["q1", "q2"]);
        let urls: Vec<_> = run.results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://e.com/a", "https://e.com/b", "https://e.com/c"]);
        assert_eq!(run.results[0].title.as_deref(), Some("A"));
        assert_eq!(run.sources.len(), 3);
        assert!(run.sources[0].content.contains("apple facts"));
        assert!(run.sources[1].content.contains("banana facts"));
        assert_eq!(run.sources[2].content, "");
        assert_eq!(run.answer.as_deref(), Some("grounded answer"));

        // The synthesis prompt carries the scraped sources.
        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].user.contains("Source: A (https://e.com/a)"));
        assert!(calls[1].user.contains("apple facts"));
    }

    #[tokio::test]
    async fn decomposition_failure_searches_the_original_query() {
        let mut hits = HashMap::new();
        hits.insert("what is x".to_string(), vec![hit("https://e.com/a", "A")]);
        let mut pages = HashMap::new();
        pages.insert("https://e.com/a".to_string(), "<p>x is x</p>".to_string());

        let (p, _llm, _fetcher) = pipeline(
            hits,
            pages,
            vec![Err(Error::Llm("down".into())), Ok("x answer".into())],
        );
        let run = p.run("what is x").await;
        assert_eq!(run.sub_queries, vec!["what is x"]);
        assert_eq!(run.answer.as_deref(), Some("x answer"));
    }

    #[tokio::test]
    async fn empty_searches_still_reach_synthesis() {
        let mut hits = HashMap::new();
        hits.insert("q1".to_string(), Vec::new());
        let (p, llm, fetcher) = pipeline(
            hits,
            HashMap::new(),
            vec![Ok("q1".into()), Ok("nothing found online".into())],
        );
        let run = p.run("obscure?").await;
        assert!(run.results.is_empty());
        assert!(run.sources.is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(run.answer.as_deref(), Some("nothing found online"));
        assert_eq!(llm.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn synthesis_failure_yields_no_answer() {
        let mut hits = HashMap::new();
        hits.insert("q1".to_string(), vec![hit("https://e.com/a", "A")]);
        let (p, _llm, _fetcher) = pipeline(
            hits,
            HashMap::new(),
            vec![Ok("q1".into()), Err(Error::Llm("overloaded".into()))],
        );
        assert!(p.answer_with_web_search("anything").await.is_none());
    }

    #[tokio::test]
    async fn a_blank_synthesis_reply_yields_no_answer() {
        let mut hits = HashMap::new();
        hits.insert("q1".to_string(), Vec::new());
        let (p, _llm, _fetcher) = pipeline(
            hits,
            HashMap::new(),
            vec![Ok("q1".into()), Ok("   ".into())],
        );
        let run = p.run("anything").await;
        assert!(run.answer.is_none());
    }

    #[tokio::test]
    async fn selection_stops_at_top_sources() {
        let mut hits = HashMap::new();
        hits.insert(
            "q1".to_string(),
            vec![
                hit("https://e.com/1", "1"),
                hit("https://e.com/2", "2"),
                hit("https://e.com/3", "3"),
                hit("https://e.com/4", "4"),
                hit("https://e.com/5", "5"),
            ],
        );
        let llm = Arc::new(ScriptedLlm::new(vec![Ok("q1".into()), Ok("a".into())]));
        let fetcher = Arc::new(MapFetcher {
            pages: HashMap::new(),
            calls: AtomicUsize::new(0),
        });
        let config = PipelineConfig {
            results_per_query: 5,
            top_sources: 3,
            ..PipelineConfig::default()
        };
        let p = Pipeline::new(Arc::new(MapSearch { hits }), fetcher.clone(), llm, config);
        let run = p.run("q").await;
        assert_eq!(run.results.len(), 5);
        assert_eq!(run.sources.len(), 3);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }
}
