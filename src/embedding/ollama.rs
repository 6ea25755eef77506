use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{EmbedError, Embedding, EmbeddingProvider};
use crate::config;

const DEFAULT_MODEL: &str = "paraphrase-multilingual";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Embedding>,
    error: Option<String>,
}

/// Embeddings from a local Ollama server (`POST /api/embed`).
///
/// Configuration via environment variables:
/// - `OLLAMA_HOST`: server base URL (default `http://localhost:11434`)
/// - `SEMTRANS_EMBED_MODEL`: embedding model (default `paraphrase-multilingual`)
#[derive(Clone, Debug)]
pub struct OllamaEmbedder {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    /// `model` overrides `SEMTRANS_EMBED_MODEL` when given.
    pub fn from_env(http: Client, model: Option<&str>) -> Result<Self, EmbedError> {
        let base_url = config::ollama_base_url()?;
        let model = model
            .map(str::to_string)
            .unwrap_or_else(|| config::env_or("SEMTRANS_EMBED_MODEL", DEFAULT_MODEL));
        Ok(Self::new(http, &base_url, &model))
    }

    pub fn new(http: Client, base_url: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("User-Agent", crate::USER_AGENT)
            .json(&EmbedRequest {
                model: &self.model,
                input: text,
            })
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    EmbedError::Unreachable(self.base_url.clone())
                } else {
                    EmbedError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<EmbedResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| {
                    let end = body.floor_char_boundary(200);
                    format!("HTTP {status}: {}", &body[..end])
                });
            warn!(status = %status, model = %self.model, "Ollama embed error");
            return Err(EmbedError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: EmbedResponse = response.json().await?;
        let embedding = body
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(EmbedError::EmptyVector)?;
        debug!(model = %self.model, dim = embedding.len(), "embedding computed");
        Ok(embedding)
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn embed_returns_first_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_json(serde_json::json!({
                "model": "paraphrase-multilingual",
                "input": "freedom"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "paraphrase-multilingual",
                "embeddings": [[0.1, 0.2, 0.3]]
            })))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(Client::new(), &server.uri(), DEFAULT_MODEL);
        let v = embedder.embed("freedom").await.unwrap();
        assert_eq!(v, vec![0.1f32, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn empty_embeddings_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embeddings": [] })),
            )
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(Client::new(), &server.uri(), DEFAULT_MODEL);
        let err = embedder.embed("x").await.unwrap_err();
        assert!(matches!(err, EmbedError::EmptyVector));
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": "model \"paraphrase-multilingual\" not found, try pulling it first"
            })))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(Client::new(), &server.uri(), DEFAULT_MODEL);
        match embedder.embed("x").await {
            Err(EmbedError::Api { code: 404, message }) => {
                assert!(message.contains("not found"), "got: {message}");
            }
            other => panic!("expected Api(404), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_keeps_body_snippet() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(Client::new(), &server.uri(), DEFAULT_MODEL);
        match embedder.embed("x").await {
            Err(EmbedError::Api { code: 500, message }) => assert!(message.contains("boom")),
            other => panic!("expected Api(500), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let embedder = OllamaEmbedder::new(Client::new(), "http://127.0.0.1:1", DEFAULT_MODEL);
        let err = embedder.embed("x").await.unwrap_err();
        assert!(matches!(err, EmbedError::Unreachable(_)), "got: {err:?}");
        assert!(err.to_string().contains("ollama serve"));
    }
}
