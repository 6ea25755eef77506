use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::retry::Backoff;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use super::{GenerateError, Translator, chat_prompt, snippet};
use crate::config;
use crate::lang::Language;

const API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";
const SYSTEM_PROMPT: &str =
    "You are a semantic translator that translates by understanding intent, not word-for-word.";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 60;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Client for a hosted chat-completion API.
///
/// Configuration via environment variables:
/// - `OPENAI_API_KEY`: required
/// - `OPENAI_MODEL`: model override (default `gpt-4`)
/// - `OPENAI_BASE_URL`: API base (default `https://api.openai.com/v1`)
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
    backoff: Backoff,
}

impl OpenAiClient {
    pub fn from_env(http: Client, model: Option<&str>) -> Result<Self, GenerateError> {
        let api_key = config::env_opt("OPENAI_API_KEY").ok_or(GenerateError::ApiKeyNotSet)?;
        let model = model
            .map(str::to_string)
            .or_else(|| config::env_opt("OPENAI_MODEL"))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = checked_base_url(&config::env_or("OPENAI_BASE_URL", API_BASE))?;
        Ok(Self {
            http,
            api_key: ApiKey(api_key),
            model,
            base_url,
            backoff: Backoff::default(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
            backoff: Backoff {
                attempts: 3,
                initial: Duration::from_millis(5),
            },
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("chat API rate limited");
            return Err(GenerateError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ChatCompletionResponse>(&text)
                .ok()
                .and_then(|body| body.error)
                .and_then(|err| err.message)
                .unwrap_or_else(|| format!("HTTP {status}: {}", snippet(&text)));
            warn!(status = %status, "chat API error");
            return Err(GenerateError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: ChatCompletionResponse = response.json().await?;
        if let Some(err) = body.error {
            let message = err.message.unwrap_or_else(|| "Unknown error".to_string());
            warn!(kind = ?err.kind, code = ?err.code, "chat API error in 200 response");
            return Err(GenerateError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let content = body
            .choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(GenerateError::EmptyResponse)?;
        debug!(model = %self.model, "chat completion complete");
        Ok(content)
    }
}

impl Translator for OpenAiClient {
    async fn translate(&self, text: &str, source: Language) -> Result<String, GenerateError> {
        let prompt = chat_prompt(text, source);
        self.backoff.retry(|| self.complete(&prompt)).await
    }
}

/// The API key travels in a header, so plain HTTP is only accepted for a
/// proxy on the loopback interface.
fn checked_base_url(raw: &str) -> Result<String, GenerateError> {
    let parsed = url::Url::parse(raw)?;
    match parsed.scheme() {
        "https" => {}
        "http" if is_loopback(&parsed) => {}
        _ => return Err(GenerateError::InsecureUrl(raw.to_string())),
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn is_loopback(url: &url::Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(d)) => d.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn translate_sends_chat_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4",
                "max_tokens": 60,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": chat_prompt("friend", Language::En) }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(" חבר ")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url(Client::new(), &server.uri());
        let out = client.translate("friend", Language::En).await.unwrap();
        assert_eq!(out, "חבר");
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url(Client::new(), &server.uri());
        match client.translate("x", Language::En).await {
            Err(GenerateError::Api { code: 401, message }) => {
                assert!(message.contains("Incorrect API key"));
            }
            other => panic!("expected Api(401), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("sad")))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url(Client::new(), &server.uri());
        let out = client.translate("עצוב", Language::He).await.unwrap();
        assert_eq!(out, "sad");
    }

    #[tokio::test]
    async fn persistent_rate_limit_gives_up_after_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url(Client::new(), &server.uri());
        let err = client.translate("x", Language::En).await.unwrap_err();
        assert!(matches!(err, GenerateError::RateLimited));
    }

    #[tokio::test]
    async fn empty_choices_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url(Client::new(), &server.uri());
        let err = client.translate("x", Language::En).await.unwrap_err();
        assert!(matches!(err, GenerateError::EmptyResponse));
    }
}
