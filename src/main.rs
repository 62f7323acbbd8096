mod config;
mod embedding;
mod fetch;
mod gemini;
mod index;
mod notify;
mod query;
mod report;
mod retrieval;
mod retry;
mod store;

pub const USER_AGENT: &str = concat!("debate-retrieval/", env!("CARGO_PKG_VERSION"));

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use reqwest::{Client, redirect};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use config::Settings;
use embedding::OpenAiEmbedder;
use fetch::TokioDnsResolver;
use gemini::GeminiClient;
use notify::StderrSink;
use query::{Lang, LlmQueryImprover, QueryImprover};
use report::QueryResults;
use retrieval::{HttpPageFetcher, TextSplitter, WebRetriever};
use store::{DEFAULT_K, TopicStore};

type Store = TopicStore<
    LlmQueryImprover<GeminiClient>,
    WebRetriever<GeminiClient, HttpPageFetcher<TokioDnsResolver>>,
    OpenAiEmbedder,
>;

/// Build per-topic evidence indexes from the web and search them.
#[derive(Parser)]
#[command(name = "debate-retrieval", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index for a topic and role, then run each query against it
    Search {
        #[command(flatten)]
        target: Target,
        /// Language of retrieved material (defaults to RETRIEVAL_LANG)
        #[arg(long, value_enum)]
        lang: Option<Lang>,
        /// Number of documents per query
        #[arg(short, default_value_t = DEFAULT_K)]
        k: usize,
        /// Print JSON instead of Markdown
        #[arg(long)]
        json: bool,
        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// Print the search queries generated for a topic and role
    Queries {
        #[command(flatten)]
        target: Target,
    },
    /// Read queries from stdin (`/clear` drops cached indexes, `/quit` exits)
    Shell {
        #[command(flatten)]
        target: Target,
        #[arg(long, value_enum)]
        lang: Option<Lang>,
        #[arg(short, default_value_t = DEFAULT_K)]
        k: usize,
    },
}

#[derive(Args)]
struct Target {
    /// Debate topic
    #[arg(long)]
    topic: String,
    /// Side or role being argued
    #[arg(long)]
    role: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debate_retrieval=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    info!(?settings, "starting debate-retrieval");

    let http = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .redirect(redirect::Policy::limited(5))
        .build()?;
    let gemini = GeminiClient::new(http.clone(), &settings.gemini_api_key, &settings.gemini_model)?;

    match cli.command {
        Command::Queries { target } => {
            let queries = LlmQueryImprover::new(gemini)
                .with_max_queries(settings.max_queries)
                .improve(&target.topic, &target.role)
                .await?;
            print!("{}", report::format_queries(&target.topic, &target.role, &queries));
        }
        Command::Search {
            target,
            lang,
            k,
            json,
            queries,
        } => {
            let lang = lang.unwrap_or(settings.lang);
            let store = build_store(&settings, lang, http, gemini)?;
            store.build_index(&target.topic, &target.role, lang).await?;

            let mut hits = Vec::with_capacity(queries.len());
            for query in &queries {
                hits.push(store.search(&target.topic, &target.role, query, k).await?);
            }
            let results: Vec<QueryResults<'_>> = queries
                .iter()
                .zip(&hits)
                .map(|(query, hits)| QueryResults {
                    topic: &target.topic,
                    role: &target.role,
                    query,
                    hits,
                })
                .collect();

            if json {
                println!("{}", report::to_json(&results)?);
            } else {
                for result in &results {
                    println!("{}", report::format_hits(result));
                }
            }
        }
        Command::Shell { target, lang, k } => {
            let lang = lang.unwrap_or(settings.lang);
            let store = build_store(&settings, lang, http, gemini)?;
            shell(&store, &target, lang, k).await?;
        }
    }

    Ok(())
}

fn build_store(
    settings: &Settings,
    lang: Lang,
    http: Client,
    gemini: GeminiClient,
) -> Result<Store, Box<dyn std::error::Error>> {
    let splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap)?;
    let fetcher = HttpPageFetcher::new(http.clone(), TokioDnsResolver);
    let retriever =
        WebRetriever::new(gemini.clone(), fetcher, splitter).with_max_pages(settings.max_pages);
    let embedder = OpenAiEmbedder::new(
        http,
        settings.openai_api_key()?,
        &settings.embedding_model,
        settings.openai_base_url.as_deref(),
    )?
    .with_batch_size(settings.embedding_batch);
    let improver = LlmQueryImprover::new(gemini).with_max_queries(settings.max_queries);

    Ok(TopicStore::new(improver, retriever, embedder)
        .with_sink(Arc::new(StderrSink))
        .with_default_lang(lang))
}

async fn shell(
    store: &Store,
    target: &Target,
    lang: Lang,
    k: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(index) = store.get_topic_index(&target.topic, &target.role, lang).await else {
        eprintln!("no documents found for {} ({})", target.topic, target.role);
        return Ok(());
    };
    let key = index.key();
    eprintln!(
        "indexed {} chunks for {} ({}, {}) from {} queries; enter a query, /clear or /quit",
        index.index().len(),
        key.topic,
        key.role,
        index.lang().code(),
        index.queries().len()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/clear" => {
                store.clear();
                eprintln!("cache cleared ({} cached)", store.cached_len());
            }
            query => {
                let documents = store.search_topic(&target.topic, &target.role, query, k).await;
                println!(
                    "{}",
                    report::format_documents(&target.topic, &target.role, query, &documents)
                );
            }
        }
    }
    Ok(())
}
