//! Embedding capability consumed by the matcher, plus cosine similarity.

pub mod ollama;

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

pub use ollama::OllamaEmbedder;

pub type Embedding = Vec<f32>;

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding service unreachable at {0}. Start it with: ollama serve")]
    Unreachable(String),

    #[error("embedding API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("embedding service returned an empty vector")]
    EmptyVector,

    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("embedding contains a non-finite component")]
    NonFinite,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid embedding service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Produces a meaning-bearing vector for a piece of text.
///
/// Implementations must be deterministic for identical input and place
/// translations of the same word close together across languages.
/// `OllamaEmbedder` is the production implementation; tests use stubs.
#[allow(async_fn_in_trait)]
pub trait EmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError>;
}

impl<E: EmbeddingProvider> EmbeddingProvider for &E {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        (**self).embed(text).await
    }
}

/// Cosine of the angle between `a` and `b`, in [-1, 1].
/// A zero-norm vector has no direction and scores 0.0 against anything.
/// NaN or infinite components are rejected rather than scored.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EmbedError> {
    if a.len() != b.len() {
        return Err(EmbedError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&av, &bv) in a.iter().zip(b) {
        let (av, bv) = (av as f64, bv as f64);
        dot += av * bv;
        norm_a += av * av;
        norm_b += bv * bv;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if !dot.is_finite() || !denom.is_finite() {
        return Err(EmbedError::NonFinite);
    }
    if denom == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / denom).clamp(-1.0, 1.0) as f32)
}

/// Opt-in memoization of an inner provider, keyed by text.
///
/// Results are identical to the inner provider's; only the number of
/// calls changes. Call [`CachedEmbedder::clear`] when the lexicon changes.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Mutex<HashMap<String, Embedding>>,
}

impl<E> CachedEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Embedding>> {
        // A poisoned cache only means a panic elsewhere; the map is still valid.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<E: EmbeddingProvider> EmbeddingProvider for CachedEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        if let Some(hit) = self.lock().get(text) {
            debug!(text, "embedding cache hit");
            return Ok(hit.clone());
        }
        let embedding = self.inner.embed(text).await?;
        self.lock().insert(text.to_string(), embedding.clone());
        Ok(embedding)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StubEmbedder;
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn identical_vectors_score_one() {
        let v = [0.3, -1.2, 4.0];
        assert!(approx(cosine_similarity(&v, &v).unwrap(), 1.0));
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        assert!(approx(cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap(), -1.0));
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert!(approx(cosine_similarity(&[1.0, 0.0], &[0.0, 5.0]).unwrap(), 0.0));
    }

    #[test]
    fn magnitude_does_not_matter() {
        let a = cosine_similarity(&[1.0, 1.0], &[2.0, 1.0]).unwrap();
        let b = cosine_similarity(&[10.0, 10.0], &[2.0, 1.0]).unwrap();
        assert!(approx(a, b));
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
    }

    #[test]
    fn dimension_mismatch_is_error() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            EmbedError::DimensionMismatch { left: 2, right: 1 }
        ));
    }

    #[test]
    fn non_finite_components_are_rejected() {
        for bad in [[f32::NAN, 0.0], [f32::INFINITY, 1.0], [0.0, f32::NEG_INFINITY]] {
            let err = cosine_similarity(&bad, &[1.0, 0.0]).unwrap_err();
            assert!(matches!(err, EmbedError::NonFinite), "{bad:?}");
            let err = cosine_similarity(&[1.0, 0.0], &bad).unwrap_err();
            assert!(matches!(err, EmbedError::NonFinite), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn cache_calls_inner_once_per_text() {
        let stub = StubEmbedder::new(&[("a", &[1.0, 0.0]), ("b", &[0.0, 1.0])]);
        let cached = CachedEmbedder::new(&stub);

        let first = cached.embed("a").await.unwrap();
        let second = cached.embed("a").await.unwrap();
        cached.embed("b").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(stub.calls(), 2);
        assert_eq!(cached.len(), 2);
    }

    #[tokio::test]
    async fn cache_clear_forces_recompute() {
        let stub = StubEmbedder::new(&[("a", &[1.0])]);
        let cached = CachedEmbedder::new(&stub);

        cached.embed("a").await.unwrap();
        cached.clear();
        cached.embed("a").await.unwrap();

        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn cache_does_not_store_failures() {
        let stub = StubEmbedder::new(&[]);
        let cached = CachedEmbedder::new(&stub);

        assert!(cached.embed("missing").await.is_err());
        assert!(cached.embed("missing").await.is_err());
        assert_eq!(stub.calls(), 2);
        assert!(cached.is_empty());
    }
}
