//! answerpipe command line interface.
//!
//! Wires the HTTP-backed providers from `answerpipe-local` into the
//! pipeline and exposes it as `answer`, plus `search`, `doctor` and
//! `version` helpers. Logs go to stderr; stdout carries only command
//! output so JSON mode stays pipeable.

mod envelope;

use std::sync::Arc;
use std::time::Duration;

use answerpipe::{
    FetchBackend, Pipeline, PipelineConfig, SearchProvider, SearchQuery, TextCompleter,
};
use answerpipe_local::gemini::GeminiClient;
use answerpipe_local::openai_compat::OpenAiCompat;
use answerpipe_local::search::{BraveSearch, SearxngSearch, TavilySearch};
use answerpipe_local::HttpFetcher;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};

const EXIT_FAILURE: i32 = 1;
const EXIT_NOT_CONFIGURED: i32 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "answerpipe",
    version,
    about = "Web-grounded answers: decompose, search, scrape, synthesize"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a query with web search grounding.
    Answer(AnswerArgs),
    /// Run one web search and print the hits.
    Search(SearchArgs),
    /// Report which providers and backends are configured. No network.
    Doctor(DoctorArgs),
    /// Print version information.
    Version(VersionArgs),
}

#[derive(Args, Debug)]
struct AnswerArgs {
    /// The question to answer.
    query: String,
    /// Output mode: "text" or "json".
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
    /// Search provider: brave, tavily or searxng. Auto-picked when unset.
    #[arg(long)]
    provider: Option<String>,
    /// Completion backend: openai or gemini. Auto-picked when unset.
    #[arg(long)]
    llm: Option<String>,
    /// Sources scraped and handed to synthesis.
    #[arg(long, default_value_t = 3)]
    top_sources: usize,
    /// Search hits requested per sub-query.
    #[arg(long, default_value_t = 2)]
    results_per_query: u32,
    /// Per-page scrape timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    scrape_timeout_ms: u64,
    /// Per-completion timeout in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    llm_timeout_ms: u64,
}

#[derive(Args, Debug)]
struct SearchArgs {
    query: String,
    /// Output mode: "text" or "json".
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
    /// Search provider: brave, tavily or searxng. Auto-picked when unset.
    #[arg(long)]
    provider: Option<String>,
    #[arg(long, default_value_t = 5)]
    max_results: u32,
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,
}

#[derive(Args, Debug)]
struct DoctorArgs {
    /// Output mode: "json" or "text".
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(Args, Debug)]
struct VersionArgs {
    /// Output mode: "json" or "text".
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Answer(args) => cmd_answer(args).await,
        Commands::Search(args) => cmd_search(args).await,
        Commands::Doctor(args) => cmd_doctor(args),
        Commands::Version(args) => cmd_version(args),
    }
}

/// Opt-in: loads KEY=VALUE lines from the file named by
/// `ANSWERPIPE_ENV_FILE`. Only sets variables that are currently unset, so
/// the real environment always wins. Values are never logged.
fn load_env_file() {
    let Some(path) = std::env::var("ANSWERPIPE_ENV_FILE")
        .ok()
        .filter(|s| !s.trim().is_empty())
    else {
        return;
    };
    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("answerpipe: could not read env file {path}: {e}");
            return;
        }
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if key.is_empty() || std::env::var_os(key).is_some() {
            continue;
        }
        std::env::set_var(key, value);
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn has_env(name: &str) -> bool {
    env(name).is_some()
}

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(answerpipe_local::DEFAULT_USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(60))
        .build()?)
}

fn auto_search_name() -> Option<&'static str> {
    if has_env("ANSWERPIPE_BRAVE_API_KEY") || has_env("BRAVE_SEARCH_API_KEY") {
        Some("brave")
    } else if has_env("ANSWERPIPE_TAVILY_API_KEY") || has_env("TAVILY_API_KEY") {
        Some("tavily")
    } else if has_env("ANSWERPIPE_SEARXNG_ENDPOINT") || has_env("SEARXNG_ENDPOINT") {
        Some("searxng")
    } else {
        None
    }
}

fn auto_llm_name() -> Option<&'static str> {
    if has_env("ANSWERPIPE_OPENAI_API_KEY")
        || has_env("OPENAI_API_KEY")
        || has_env("ANSWERPIPE_OPENAI_BASE_URL")
    {
        Some("openai")
    } else if has_env("ANSWERPIPE_GEMINI_API_KEY")
        || has_env("GEMINI_API_KEY")
        || has_env("GOOGLE_API_KEY")
    {
        Some("gemini")
    } else {
        None
    }
}

/// Resolves a search provider: explicit flag, then `ANSWERPIPE_SEARCH`,
/// then the first provider with configuration present.
fn search_provider(
    client: &reqwest::Client,
    choice: Option<&str>,
) -> answerpipe::Result<Arc<dyn SearchProvider>> {
    let choice = choice
        .map(|s| s.to_ascii_lowercase())
        .or_else(|| env("ANSWERPIPE_SEARCH").map(|s| s.to_ascii_lowercase()))
        .or_else(|| auto_search_name().map(|s| s.to_string()));
    match choice.as_deref() {
        Some("brave") => Ok(Arc::new(BraveSearch::from_env(client.clone())?)),
        Some("tavily") => Ok(Arc::new(TavilySearch::from_env(client.clone())?)),
        Some("searxng") => Ok(Arc::new(SearxngSearch::from_env(client.clone())?)),
        Some(other) => Err(answerpipe::Error::NotConfigured(format!(
            "unknown search provider: {other} (expected brave, tavily or searxng)"
        ))),
        None => Err(answerpipe::Error::NotConfigured(
            "no search provider configured; set ANSWERPIPE_BRAVE_API_KEY, \
             ANSWERPIPE_TAVILY_API_KEY or ANSWERPIPE_SEARXNG_ENDPOINT"
                .into(),
        )),
    }
}

/// Resolves a completion backend: explicit flag, then `ANSWERPIPE_LLM`,
/// then OpenAI-compatible config, then Gemini.
fn completer(
    client: &reqwest::Client,
    choice: Option<&str>,
) -> answerpipe::Result<Arc<dyn TextCompleter>> {
    let choice = choice
        .map(|s| s.to_ascii_lowercase())
        .or_else(|| env("ANSWERPIPE_LLM").map(|s| s.to_ascii_lowercase()))
        .or_else(|| auto_llm_name().map(|s| s.to_string()));
    match choice.as_deref() {
        Some("openai") => Ok(Arc::new(OpenAiCompat::from_env(client.clone())?)),
        Some("gemini") => Ok(Arc::new(GeminiClient::from_env(client.clone())?)),
        Some(other) => Err(answerpipe::Error::NotConfigured(format!(
            "unknown completion backend: {other} (expected openai or gemini)"
        ))),
        None => Err(answerpipe::Error::NotConfigured(
            "no completion backend configured; set OPENAI_API_KEY, \
             ANSWERPIPE_OPENAI_BASE_URL or GEMINI_API_KEY"
                .into(),
        )),
    }
}

fn fail(kind: &str, json: bool, err: &answerpipe::Error) -> ! {
    if json {
        println!("{}", envelope::error_envelope(kind, err));
    } else {
        eprintln!("answerpipe: {err}");
    }
    std::process::exit(EXIT_NOT_CONFIGURED)
}

async fn cmd_answer(args: AnswerArgs) -> Result<()> {
    let json = args.output.to_ascii_lowercase() != "text";
    let client = http_client()?;
    let search = match search_provider(&client, args.provider.as_deref()) {
        Ok(s) => s,
        Err(err) => fail("answer", json, &err),
    };
    let llm = match completer(&client, args.llm.as_deref()) {
        Ok(l) => l,
        Err(err) => fail("answer", json, &err),
    };
    tracing::debug!(search = search.name(), llm = llm.name(), "providers wired");
    let fetcher: Arc<dyn FetchBackend> = Arc::new(HttpFetcher::with_client(client));
    let config = PipelineConfig {
        results_per_query: args.results_per_query,
        top_sources: args.top_sources,
        scrape_timeout_ms: args.scrape_timeout_ms,
        llm_timeout_ms: args.llm_timeout_ms,
        ..PipelineConfig::default()
    };
    let run = Pipeline::new(search, fetcher, llm, config)
        .run(&args.query)
        .await;

    if json {
        let mut payload = serde_json::json!({
            "schema_version": envelope::SCHEMA_VERSION,
            "kind": "answer",
            "ok": run.answer.is_some(),
            "query": run.query,
            "sub_queries": run.sub_queries,
            "results": run.results,
            "sources": run.sources,
            "answer": run.answer,
        });
        if run.answer.is_none() {
            payload["error"] = envelope::error_obj(
                envelope::ErrorCode::NoAnswer,
                "the pipeline produced no answer",
                None,
            );
        }
        println!("{payload}");
    } else if let Some(answer) = &run.answer {
        println!("{answer}");
    } else {
        eprintln!("answerpipe: no answer could be produced for this query");
    }
    if run.answer.is_none() {
        std::process::exit(EXIT_FAILURE);
    }
    Ok(())
}

async fn cmd_search(args: SearchArgs) -> Result<()> {
    let json = args.output.to_ascii_lowercase() != "text";
    let client = http_client()?;
    let provider = match search_provider(&client, args.provider.as_deref()) {
        Ok(p) => p,
        Err(err) => fail("search", json, &err),
    };
    tracing::debug!(provider = provider.name(), "provider wired");
    let q = SearchQuery {
        query: args.query.clone(),
        max_results: Some(args.max_results),
        timeout_ms: Some(args.timeout_ms),
    };
    match provider.search(&q).await {
        Ok(resp) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "schema_version": envelope::SCHEMA_VERSION,
                        "kind": "search",
                        "ok": true,
                        "provider": resp.provider,
                        "query": args.query,
                        "results": resp.results,
                    })
                );
            } else {
                for (i, r) in resp.results.iter().enumerate() {
                    println!("{}. {}", i + 1, r.title.as_deref().unwrap_or("(untitled)"));
                    println!("   {}", r.url);
                    if let Some(snippet) = &r.snippet {
                        println!("   {snippet}");
                    }
                }
                if resp.results.is_empty() {
                    eprintln!("answerpipe: no results");
                }
            }
            Ok(())
        }
        Err(err) => {
            if json {
                println!("{}", envelope::error_envelope("search", &err));
            } else {
                eprintln!("answerpipe: {err}");
            }
            std::process::exit(EXIT_FAILURE);
        }
    }
}

/// Presence checks only. Key values never reach stdout or stderr.
fn cmd_doctor(args: DoctorArgs) -> Result<()> {
    let brave = has_env("ANSWERPIPE_BRAVE_API_KEY") || has_env("BRAVE_SEARCH_API_KEY");
    let tavily = has_env("ANSWERPIPE_TAVILY_API_KEY") || has_env("TAVILY_API_KEY");
    let searxng = has_env("ANSWERPIPE_SEARXNG_ENDPOINT") || has_env("SEARXNG_ENDPOINT");
    let openai = has_env("ANSWERPIPE_OPENAI_API_KEY")
        || has_env("OPENAI_API_KEY")
        || has_env("ANSWERPIPE_OPENAI_BASE_URL");
    let gemini =
        has_env("ANSWERPIPE_GEMINI_API_KEY") || has_env("GEMINI_API_KEY") || has_env("GOOGLE_API_KEY");

    if args.output.to_ascii_lowercase() == "text" {
        let word = |b: bool| if b { "configured" } else { "not configured" };
        println!("search providers:");
        println!("  brave:   {}", word(brave));
        println!("  tavily:  {}", word(tavily));
        println!("  searxng: {}", word(searxng));
        println!("  selected: {}", auto_search_name().unwrap_or("none"));
        println!("completion backends:");
        println!("  openai: {}", word(openai));
        println!("  gemini: {}", word(gemini));
        println!("  selected: {}", auto_llm_name().unwrap_or("none"));
    } else {
        let payload = serde_json::json!({
            "schema_version": envelope::SCHEMA_VERSION,
            "kind": "doctor",
            "ok": true,
            "search": {
                "brave": { "configured": brave, "env": ["ANSWERPIPE_BRAVE_API_KEY", "BRAVE_SEARCH_API_KEY"] },
                "tavily": { "configured": tavily, "env": ["ANSWERPIPE_TAVILY_API_KEY", "TAVILY_API_KEY"] },
                "searxng": { "configured": searxng, "env": ["ANSWERPIPE_SEARXNG_ENDPOINT", "SEARXNG_ENDPOINT"] },
                "selected": auto_search_name(),
            },
            "llm": {
                "openai": { "configured": openai, "env": ["ANSWERPIPE_OPENAI_API_KEY", "OPENAI_API_KEY", "ANSWERPIPE_OPENAI_BASE_URL"] },
                "gemini": { "configured": gemini, "env": ["ANSWERPIPE_GEMINI_API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"] },
                "selected": auto_llm_name(),
            },
        });
        println!("{payload}");
    }
    Ok(())
}

fn cmd_version(args: VersionArgs) -> Result<()> {
    if args.output.to_ascii_lowercase() == "text" {
        println!("answerpipe {}", env!("CARGO_PKG_VERSION"));
    } else {
        println!(
            "{}",
            serde_json::json!({
                "schema_version": envelope::SCHEMA_VERSION,
                "kind": "version",
                "ok": true,
                "name": "answerpipe",
                "version": env!("CARGO_PKG_VERSION"),
            })
        );
    }
    Ok(())
}
