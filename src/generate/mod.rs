//! Generation-backed translators: free-form answers from a language model,
//! as an alternative to nearest-candidate matching.

pub mod ollama;
pub mod openai;
pub mod retry;
pub mod types;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::lang::Language;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Ollama is not running at {0}. Please start it with: ollama serve")]
    Unreachable(String),

    #[error("OPENAI_API_KEY not set. Export it before using the openai strategy.")]
    ApiKeyNotSet,

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("model returned an empty translation")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("refusing to send the API key to {0}: use HTTPS (plain HTTP is allowed only for localhost)")]
    InsecureUrl(String),
}

impl GenerateError {
    /// Whether the same request may succeed if sent again later:
    /// rate limiting and server-side (5xx) failures.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited
                | Self::Api {
                    code: 500..=599,
                    ..
                }
        )
    }
}

/// Translates a word or phrase into the opposite language of `source`.
/// Implemented by `OllamaClient` and `OpenAiClient`; mocks in tests.
#[allow(async_fn_in_trait)]
pub trait Translator {
    async fn translate(&self, text: &str, source: Language) -> Result<String, GenerateError>;
}

/// Prompt for a local completion model, which needs an explicit
/// "only return" instruction to avoid chatter.
pub fn ollama_prompt(text: &str, source: Language) -> String {
    let target = source.opposite();
    format!(
        "You are a professional {target} translator. Translate the following {source} word or phrase to accurate and fluent {target} based on its intended meaning and context.\n\
         Text: {text}\n\
         Only return the {target} translation.",
        target = target.name(),
        source = source.name(),
    )
}

/// User prompt for a chat model; the system message carries the role.
pub fn chat_prompt(text: &str, source: Language) -> String {
    let target = match source.opposite() {
        Language::He => "עברית",
        Language::En => "English",
    };
    format!(
        "Translate the following {} word or phrase to {target} by finding the closest word with the same meaning or intention, not necessarily literal:\n{text}",
        source.code().to_uppercase(),
    )
}

fn snippet(body: &str) -> &str {
    &body[..body.floor_char_boundary(200)]
}
