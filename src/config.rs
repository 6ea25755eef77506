//! Environment-driven settings shared by the HTTP collaborators.

use std::env;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Reads `name`, trimmed; unset or blank falls back to `default`.
pub fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

pub fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Ollama server base URL from `OLLAMA_HOST`.
///
/// Accepts a bare `host:port` the way the Ollama CLI does.
pub fn ollama_base_url() -> Result<String, url::ParseError> {
    normalize_base_url(&env_or("OLLAMA_HOST", DEFAULT_OLLAMA_HOST))
}

fn normalize_base_url(raw: &str) -> Result<String, url::ParseError> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let parsed = url::Url::parse(&with_scheme)?;
    if parsed.host_str().is_none() {
        return Err(url::ParseError::EmptyHost);
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
