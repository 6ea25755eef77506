//! Interchangeable translation strategies: nearest-candidate matching over
//! a fixed lexicon, or free-form generation by a language model.

use tracing::info;

use crate::embedding::EmbeddingProvider;
use crate::generate::{GenerateError, OllamaClient, OpenAiClient, Translator};
use crate::lang::{Language, detect_language};
use crate::lexicon::BilingualLexicon;
use crate::matcher::{self, MatchError};

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Please enter a word or phrase to translate.")]
    EmptyInput,

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub source: Language,
    pub text: String,
    /// Cosine similarity, present only for nearest-candidate matches.
    pub score: Option<f32>,
    /// Lexicon counterpart of the matched term, when it differs from the
    /// input. Shows which entry a paraphrase landed on.
    pub paired_with: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Generator {
    Ollama(OllamaClient),
    OpenAi(OpenAiClient),
}

impl Generator {
    pub fn model(&self) -> &str {
        match self {
            Generator::Ollama(c) => c.model(),
            Generator::OpenAi(c) => c.model(),
        }
    }
}

impl Translator for Generator {
    async fn translate(&self, text: &str, source: Language) -> Result<String, GenerateError> {
        match self {
            Generator::Ollama(c) => c.translate(text, source).await,
            Generator::OpenAi(c) => c.translate(text, source).await,
        }
    }
}

pub enum TranslationStrategy<E> {
    NearestCandidateMatch {
        lexicon: BilingualLexicon,
        embedder: E,
    },
    GenerationBacked(Generator),
}

impl<E: EmbeddingProvider> TranslationStrategy<E> {
    pub fn name(&self) -> &'static str {
        match self {
            TranslationStrategy::NearestCandidateMatch { .. } => "match",
            TranslationStrategy::GenerationBacked(Generator::Ollama(_)) => "ollama",
            TranslationStrategy::GenerationBacked(Generator::OpenAi(_)) => "openai",
        }
    }

    pub async fn translate(&self, text: &str) -> Result<Translation, TranslateError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TranslateError::EmptyInput);
        }
        info!(strategy = self.name(), "translating");

        match self {
            TranslationStrategy::NearestCandidateMatch { lexicon, embedder } => {
                let result = matcher::match_term(text, lexicon, embedder).await?;
                let paired_with = lexicon
                    .counterpart(&result.term)
                    .map(|c| c.text())
                    .filter(|c| !c.eq_ignore_ascii_case(text))
                    .map(str::to_string);
                Ok(Translation {
                    source: result.source,
                    text: result.term.text().to_string(),
                    score: Some(result.score),
                    paired_with,
                })
            }
            TranslationStrategy::GenerationBacked(generator) => {
                let source = detect_language(text);
                let output = generator.translate(text, source).await?;
                Ok(Translation {
                    source,
                    text: output,
                    score: None,
                    paired_with: None,
                })
            }
        }
    }
}
