//! Nearest-candidate semantic matching.
//!
//! Cost is O(V) embedding calls per query, V being the opposite-language
//! vocabulary size. There is no index or approximate search: the lexicon is
//! expected to stay in the hundreds of terms at most. Wrap the embedder in
//! [`CachedEmbedder`](crate::embedding::CachedEmbedder) to avoid
//! re-embedding candidates across queries.

use tracing::{debug, info};

use crate::embedding::{EmbedError, EmbeddingProvider, cosine_similarity};
use crate::lang::{Language, detect_language};
use crate::lexicon::{BilingualLexicon, Term};

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("input must not be empty")]
    InvalidInput,

    #[error("no {} candidates in lexicon", .0.name())]
    EmptyVocabulary(Language),

    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(#[from] EmbedError),

    #[error("matching cancelled")]
    Cancelled,
}

/// Winning candidate and its cosine similarity to the input.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub term: Term,
    pub score: f32,
    pub source: Language,
}

pub async fn match_term(
    text: &str,
    lexicon: &BilingualLexicon,
    embedder: &impl EmbeddingProvider,
) -> Result<MatchResult, MatchError> {
    match_term_until(text, lexicon, embedder, || false).await
}

/// Like [`match_term`], but polls `should_stop` before each candidate and
/// aborts with [`MatchError::Cancelled`] once it returns true.
pub async fn match_term_until(
    text: &str,
    lexicon: &BilingualLexicon,
    embedder: &impl EmbeddingProvider,
    should_stop: impl Fn() -> bool,
) -> Result<MatchResult, MatchError> {
    if text.trim().is_empty() {
        return Err(MatchError::InvalidInput);
    }

    let source = detect_language(text);
    let target = source.opposite();
    if lexicon.is_empty(target) {
        return Err(MatchError::EmptyVocabulary(target));
    }

    info!(%source, candidates = lexicon.len(target), "matching");
    let query = embedder.embed(text).await?;

    // Strict `>` keeps the first of equally scored candidates.
    let mut best: Option<(&Term, f32)> = None;
    for candidate in lexicon.candidates(target) {
        if should_stop() {
            debug!(candidate = %candidate, "match cancelled");
            return Err(MatchError::Cancelled);
        }
        let vector = embedder.embed(candidate.text()).await?;
        let score = cosine_similarity(&query, &vector)?;
        debug!(candidate = %candidate, score, "scored");
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }

    let (term, score) = best.ok_or(MatchError::EmptyVocabulary(target))?;
    info!(term = %term, score, "best match");
    Ok(MatchResult {
        term: term.clone(),
        score,
        source,
    })
}
