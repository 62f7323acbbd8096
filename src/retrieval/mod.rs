//! Document retrieval: grounded web search, page fetching, and chunking.

mod document;
mod splitter;

pub use document::Document;
pub use splitter::TextSplitter;

use std::collections::HashSet;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::fetch::{self, DnsResolver, FetchError, FetchedPage};
use crate::gemini::types::{GroundedResult, Source};
use crate::gemini::{GeminiError, SearchClient};
use crate::query::Lang;

pub const DEFAULT_MAX_PAGES: usize = 5;
const FETCH_CONCURRENCY: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("web search failed: {0}")]
    Search(#[from] GeminiError),
}

/// Fetches documents relevant to a set of queries.
pub trait ContentRetriever {
    async fn retrieve(
        &self,
        queries: &[String],
        lang: Lang,
    ) -> Result<Vec<Document>, RetrievalError>;
}

/// Downloads a single page.
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// SSRF-guarded HTTP fetcher.
pub struct HttpPageFetcher<R> {
    http: Client,
    resolver: R,
}

impl<R: DnsResolver> HttpPageFetcher<R> {
    pub fn new(http: Client, resolver: R) -> Self {
        Self { http, resolver }
    }
}

impl<R: DnsResolver> PageFetcher for HttpPageFetcher<R> {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        fetch::fetch_page(&self.http, url, &self.resolver).await
    }
}

/// Searches each query with Gemini grounding, keeps the answers, fetches the
/// top grounded sources, and chunks everything.
pub struct WebRetriever<S, F> {
    search: S,
    fetcher: F,
    max_pages: usize,
    splitter: TextSplitter,
}

impl<S: SearchClient, F: PageFetcher> WebRetriever<S, F> {
    pub fn new(search: S, fetcher: F, splitter: TextSplitter) -> Self {
        Self {
            search,
            fetcher,
            max_pages: DEFAULT_MAX_PAGES,
            splitter,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    async fn fetch_sources(&self, sources: Vec<(Source, &str)>, lang: Lang) -> Vec<Document> {
        let outcomes: Vec<_> = stream::iter(sources)
            .map(|(source, query)| async move {
                let result = self.fetcher.fetch(&source.url).await;
                (source, query, result)
            })
            .buffered(FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut documents = Vec::new();
        for (source, query, outcome) in outcomes {
            match outcome {
                Ok(page) if page.markdown.trim().is_empty() => {
                    debug!(url = %source.url, "page had no text, skipping");
                }
                Ok(page) => {
                    if page.used_raw_fallback {
                        debug!(url = %page.url, "readability fallback used");
                    }
                    let title = page
                        .title
                        .filter(|t| !t.is_empty())
                        .unwrap_or(source.title);
                    documents.push(
                        Document::new(page.markdown)
                            .with_metadata("source", page.url)
                            .with_metadata("title", title)
                            .with_metadata("kind", "page")
                            .with_metadata("query", query)
                            .with_metadata("lang", lang.code()),
                    );
                }
                Err(e) => warn!(url = %source.url, error = %e, "page fetch failed, skipping"),
            }
        }
        documents
    }
}

impl<S: SearchClient, F: PageFetcher> ContentRetriever for WebRetriever<S, F> {
    async fn retrieve(
        &self,
        queries: &[String],
        lang: Lang,
    ) -> Result<Vec<Document>, RetrievalError> {
        if queries.is_empty() {
            warn!("no queries to retrieve for");
            return Ok(Vec::new());
        }

        let searches = queries.iter().map(|q| {
            let hinted = lang.apply_to_query(q);
            async move { (q.as_str(), self.search.search(&hinted).await) }
        });
        let outcomes = join_all(searches).await;

        let mut results = Vec::new();
        let mut first_error = None;
        for (query, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push((query, result)),
                Err(e) => {
                    warn!(query, error = %e, "search failed (continuing with other queries)");
                    first_error.get_or_insert(e);
                }
            }
        }
        if results.is_empty()
            && let Some(e) = first_error
        {
            return Err(e.into());
        }

        let mut documents = answer_documents(&results, lang);
        let sources: Vec<_> = collect_unique_sources(&results)
            .into_iter()
            .take(self.max_pages)
            .collect();
        documents.extend(self.fetch_sources(sources, lang).await);

        let chunks = self.splitter.split_documents(documents);
        info!(
            queries = queries.len(),
            chunks = chunks.len(),
            "retrieval complete"
        );
        Ok(chunks)
    }
}

fn answer_documents(results: &[(&str, GroundedResult)], lang: Lang) -> Vec<Document> {
    results
        .iter()
        .filter_map(|(query, result)| {
            let answer = result.answer.as_deref()?;
            Some(
                Document::new(answer)
                    .with_metadata("source", "gemini")
                    .with_metadata("title", *query)
                    .with_metadata("kind", "answer")
                    .with_metadata("query", *query)
                    .with_metadata("lang", lang.code()),
            )
        })
        .collect()
}

/// Sources in first-seen order, each paired with the query that surfaced it.
fn collect_unique_sources<'a>(results: &[(&'a str, GroundedResult)]) -> Vec<(Source, &'a str)> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for (query, result) in results {
        for source in &result.sources {
            if !source.url.is_empty() && seen.insert(source.url.clone()) {
                sources.push((source.clone(), *query));
            }
        }
    }

    sources
}
