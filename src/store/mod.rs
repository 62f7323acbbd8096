//! Per-(topic, role) vector index store: builds once, then searches.
//!
//! Two layers:
//! - `build_index` / `search` return typed `StoreError`s.
//! - `get_topic_index` / `search_topic` never fail. Errors go to the
//!   `MessageSink` and degrade to `None` or an empty list. Finding no
//!   documents is not an error and is not reported.

mod cache;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::index::{IndexError, VectorIndex};
use crate::notify::{MessageSink, TracingSink};
use crate::query::{Lang, QueryError, QueryImprover};
use crate::retrieval::{ContentRetriever, Document, RetrievalError};
use cache::IndexCache;

pub const DEFAULT_K: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("topic and role must not be empty")]
    InvalidKey,

    #[error(transparent)]
    QueryFailed(#[from] QueryError),

    #[error("no documents found")]
    NoDocuments,

    #[error(transparent)]
    RetrievalFailed(#[from] RetrievalError),

    #[error("index construction failed: {0}")]
    EmbeddingFailed(#[source] IndexError),

    #[error("similarity search failed: {0}")]
    SearchFailed(#[source] IndexError),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicKey {
    pub topic: String,
    pub role: String,
}

impl TopicKey {
    fn new(topic: &str, role: &str) -> Result<Self, StoreError> {
        let (topic, role) = (topic.trim(), role.trim());
        if topic.is_empty() || role.is_empty() {
            return Err(StoreError::InvalidKey);
        }
        Ok(Self {
            topic: topic.to_string(),
            role: role.to_string(),
        })
    }
}

/// A built index and what produced it.
#[derive(Debug)]
pub struct TopicIndex {
    key: TopicKey,
    lang: Lang,
    queries: Vec<String>,
    index: VectorIndex,
}

impl TopicIndex {
    pub fn key(&self) -> &TopicKey {
        &self.key
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub document: Document,
    pub score: f32,
}

pub struct TopicStore<Q, R, E> {
    improver: Q,
    retriever: R,
    embedder: E,
    sink: Arc<dyn MessageSink>,
    default_lang: Lang,
    cache: IndexCache,
}

impl<Q, R, E> TopicStore<Q, R, E>
where
    Q: QueryImprover,
    R: ContentRetriever,
    E: Embedder,
{
    pub fn new(improver: Q, retriever: R, embedder: E) -> Self {
        Self {
            improver,
            retriever,
            embedder,
            sink: Arc::new(TracingSink),
            default_lang: Lang::default(),
            cache: IndexCache::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_default_lang(mut self, lang: Lang) -> Self {
        self.default_lang = lang;
        self
    }

    /// Returns the cached index for (topic, role), building it on first use.
    /// Concurrent callers for one key share a single build. `lang` only
    /// affects that first build.
    pub async fn build_index(
        &self,
        topic: &str,
        role: &str,
        lang: Lang,
    ) -> Result<Arc<TopicIndex>, StoreError> {
        let key = TopicKey::new(topic, role)?;
        let slot = self.cache.slot(&key);
        if let Some(index) = slot.get() {
            debug!(topic = %key.topic, role = %key.role, "index cache hit");
            return Ok(Arc::clone(index));
        }
        let built = slot
            .get_or_try_init(|| self.construct(key.clone(), lang))
            .await
            .map(Arc::clone);
        if built.is_err() {
            drop(slot);
            self.cache.discard_unbuilt(&key);
        }
        built
    }

    async fn construct(&self, key: TopicKey, lang: Lang) -> Result<Arc<TopicIndex>, StoreError> {
        info!(topic = %key.topic, role = %key.role, lang = lang.code(), "building topic index");

        let queries = self.improver.improve(&key.topic, &key.role).await?;
        let documents = self.retriever.retrieve(&queries, lang).await?;
        if documents.is_empty() {
            info!(topic = %key.topic, role = %key.role, "no documents retrieved");
            return Err(StoreError::NoDocuments);
        }

        let index = VectorIndex::build(documents, &self.embedder)
            .await
            .map_err(StoreError::EmbeddingFailed)?;
        info!(
            topic = %key.topic,
            role = %key.role,
            documents = index.len(),
            "topic index built"
        );

        Ok(Arc::new(TopicIndex {
            key,
            lang,
            queries,
            index,
        }))
    }

    /// Top `k` hits for `query` against the (topic, role) index, built in the
    /// store's default language if absent.
    pub async fn search(
        &self,
        topic: &str,
        role: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let index = self.build_index(topic, role, self.default_lang).await?;
        self.search_in(&index, query, k).await
    }

    async fn search_in(
        &self,
        index: &TopicIndex,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let hits = index
            .index
            .similarity_search(query, k, &self.embedder)
            .await
            .map_err(StoreError::SearchFailed)?;
        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                document: hit.document.clone(),
                score: hit.score,
            })
            .collect())
    }

    /// Like `build_index`, but reports failures to the sink and returns `None`.
    pub async fn get_topic_index(
        &self,
        topic: &str,
        role: &str,
        lang: Lang,
    ) -> Option<Arc<TopicIndex>> {
        match self.build_index(topic, role, lang).await {
            Ok(index) => Some(index),
            Err(StoreError::NoDocuments) => None,
            Err(e) => {
                self.sink
                    .notify(&format!("failed to build vector index: {e}"));
                None
            }
        }
    }

    /// Like `search`, but reports failures to the sink and returns an empty
    /// list.
    pub async fn search_topic(
        &self,
        topic: &str,
        role: &str,
        query: &str,
        k: usize,
    ) -> Vec<Document> {
        let Some(index) = self.get_topic_index(topic, role, self.default_lang).await else {
            return Vec::new();
        };
        match self.search_in(&index, query, k).await {
            Ok(hits) => hits.into_iter().map(|hit| hit.document).collect(),
            Err(e) => {
                self.sink.notify(&format!("search failed: {e}"));
                Vec::new()
            }
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Drops every cached index; the next call for any key rebuilds.
    pub fn clear(&self) {
        self.cache.clear();
    }
}
