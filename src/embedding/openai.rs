use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Embedder, EmbeddingError};
use crate::retry;

pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_BATCH_SIZE: usize = 64;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Calls the OpenAI `/v1/embeddings` endpoint in batches.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        http: Client,
        api_key: &str,
        model: &str,
        base_url: Option<&str>,
    ) -> Result<Self, EmbeddingError> {
        if api_key.trim().is_empty() {
            return Err(EmbeddingError::ApiKeyNotSet);
        }
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            model: model.to_string(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn request_batch(&self, input: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(&EmbeddingRequest {
                model: &self.model,
                input,
            })
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("embedding API rate limited");
            return Err(EmbeddingError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => envelope.error.message,
                Err(_) => text[..text.floor_char_boundary(200)].to_string(),
            };
            warn!(status = %status, "embedding API error");
            return Err(EmbeddingError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingResponse = response.json().await?;
        order_by_index(body.data, input.len())
    }

    async fn request_with_retry(&self, input: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut attempt = 0;
        loop {
            match self.request_batch(input).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if is_retriable(&e) => {
                    if !retry::pause_before_retry(attempt).await {
                        return Err(e);
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Embedder for OpenAiEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.request_with_retry(batch).await?);
        }
        debug!(model = %self.model, count = vectors.len(), "embedded texts");
        Ok(vectors)
    }
}

fn is_retriable(e: &EmbeddingError) -> bool {
    matches!(
        e,
        EmbeddingError::RateLimited
            | EmbeddingError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// The API may return items out of order; `index` is authoritative.
fn order_by_index(
    mut data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.len() != expected {
        return Err(EmbeddingError::Malformed(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    if data.iter().enumerate().any(|(i, d)| d.index != i) {
        return Err(EmbeddingError::Malformed(
            "embedding indices are not contiguous".to_string(),
        ));
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder(server: &MockServer) -> OpenAiEmbedder {
        OpenAiEmbedder::new(Client::new(), "test-key", DEFAULT_MODEL, Some(&server.uri())).unwrap()
    }

    #[tokio::test]
    async fn embeds_documents_in_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({"input": ["a", "b"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_partial_json(serde_json::json!({"input": ["c"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [0.5, 0.5]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let vectors = embedder(&server)
            .with_batch_size(2)
            .embed_documents(&texts)
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);
    }

    #[tokio::test]
    async fn embed_query_returns_single_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [0.25, 0.75]}]
            })))
            .mount(&server)
            .await;

        let vector = embedder(&server).embed_query("CO2 levels").await.unwrap();
        assert_eq!(vector, vec![0.25, 0.75]);
    }

    #[tokio::test]
    async fn client_error_surfaces_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = embedder(&server)
            .embed_query("x")
            .await
            .unwrap_err();
        match err {
            EmbeddingError::Api { code: 401, message } => {
                assert!(message.contains("Incorrect API key"));
            }
            other => panic!("expected Api(401), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_input_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let vectors = embedder(&server).embed_documents(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
