use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{GenerateRequest, GenerateResponse};
use super::{GenerateError, Translator, ollama_prompt, snippet};
use crate::config;
use crate::lang::Language;

pub const DEFAULT_MODEL: &str = "mistral";
/// Models offered by the interactive front-end; any installed model works.
pub const KNOWN_MODELS: &[&str] = &["mistral", "llama3", "gemma:2b", "mixtral"];
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a local Ollama server's `/api/generate`.
///
/// The server is pinged first so "not running" is reported distinctly
/// from a failed generation.
#[derive(Clone, Debug)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn from_env(http: Client, model: Option<&str>) -> Result<Self, GenerateError> {
        let base_url = config::ollama_base_url()?;
        Ok(Self::new(http, &base_url, model.unwrap_or(DEFAULT_MODEL)))
    }

    pub fn new(http: Client, base_url: &str, model: &str) -> Self {
        if !KNOWN_MODELS.contains(&model) {
            debug!(model, "using model outside the known list");
        }
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn ping(&self) -> Result<(), GenerateError> {
        let response = self
            .http
            .get(&self.base_url)
            .timeout(PING_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(status = %status, "Ollama ping failed");
            return Err(GenerateError::Api {
                code: status.as_u16(),
                message: "Ollama server is not responding.".to_string(),
            });
        }
        Ok(())
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("User-Agent", crate::USER_AGENT)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GenerateResponse>(&text)
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("HTTP {status}: {}", snippet(&text)));
            warn!(status = %status, model = %self.model, "Ollama generate error");
            return Err(GenerateError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response.json().await?;
        let answer = body
            .response
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or(GenerateError::EmptyResponse)?;
        debug!(model = %self.model, "ollama generation complete");
        Ok(answer)
    }

    fn classify_send_error(&self, e: reqwest::Error) -> GenerateError {
        if e.is_connect() {
            GenerateError::Unreachable(self.base_url.clone())
        } else {
            GenerateError::Network(e)
        }
    }
}

impl Translator for OllamaClient {
    async fn translate(&self, text: &str, source: Language) -> Result<String, GenerateError> {
        self.ping().await?;
        self.generate(&ollama_prompt(text, source)).await
    }
}
