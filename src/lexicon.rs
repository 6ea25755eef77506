//! Fixed bilingual vocabulary used as matching targets.
//!
//! Candidates are stored as ordered lists, not maps: iteration order is the
//! tie-break order of the matcher and must be reproducible.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::lang::{Language, detect_language};

const BUILTIN_PAIRS: &[(&str, &str)] = &[
    ("freedom", "חופש"),
    ("responsibility", "אחריות"),
    ("sad", "עצוב"),
    ("excited", "נרגש"),
    ("friend", "חבר"),
];

#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("duplicate {lang} term in lexicon: '{term}'")]
    DuplicateTerm { lang: Language, term: String },

    #[error("lexicon term '{term}' is not written in {}", .lang.name())]
    WrongLanguage { lang: Language, term: String },

    #[error("empty {0} term in lexicon")]
    EmptyTerm(Language),

    #[error("failed to read lexicon: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse lexicon: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("lexicon file mixes \"pairs\" with \"en\"/\"he\" sections")]
    MixedFormat,
}

/// A word or short phrase tagged with its language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    text: String,
    lang: Language,
}

impl Term {
    pub fn new(text: impl Into<String>, lang: Language) -> Self {
        Self {
            text: text.into(),
            lang,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lang(&self) -> Language {
        self.lang
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    term: Term,
    counterpart: Term,
}

/// Two per-language mappings from a term to its canonical counterpart.
/// Immutable once constructed.
#[derive(Debug, Clone)]
pub struct BilingualLexicon {
    en: Vec<Entry>,
    he: Vec<Entry>,
}

#[derive(Deserialize)]
struct LexiconFile {
    #[serde(default)]
    pairs: Vec<(String, String)>,
    #[serde(default)]
    en: Vec<(String, String)>,
    #[serde(default)]
    he: Vec<(String, String)>,
}

impl BilingualLexicon {
    /// Builds the lexicon from explicit per-language mappings, in order.
    pub fn new<S: Into<String>>(
        en: impl IntoIterator<Item = (S, S)>,
        he: impl IntoIterator<Item = (S, S)>,
    ) -> Result<Self, LexiconError> {
        Ok(Self {
            en: build_entries(Language::En, en)?,
            he: build_entries(Language::He, he)?,
        })
    }

    /// Builds both directions from `(english, hebrew)` pairs.
    pub fn from_pairs<S: Into<String>>(
        pairs: impl IntoIterator<Item = (S, S)>,
    ) -> Result<Self, LexiconError> {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(en, he)| (en.into(), he.into()))
            .collect();
        let reversed: Vec<(String, String)> = pairs
            .iter()
            .map(|(en, he)| (he.clone(), en.clone()))
            .collect();
        Self::new(pairs, reversed)
    }

    pub fn builtin() -> Self {
        let en = BUILTIN_PAIRS.iter().map(|(en, he)| (*en, *he));
        let he = BUILTIN_PAIRS.iter().map(|(en, he)| (*he, *en));
        Self {
            en: entries_unchecked(Language::En, en),
            he: entries_unchecked(Language::He, he),
        }
    }

    /// Loads either `{"pairs": [[english, hebrew], ...]}` or
    /// `{"en": [[term, counterpart], ...], "he": [...]}`.
    pub fn from_json_file(path: &Path) -> Result<Self, LexiconError> {
        let raw = std::fs::read_to_string(path)?;
        let lexicon = Self::from_json_str(&raw)?;
        debug!(
            path = %path.display(),
            en = lexicon.en.len(),
            he = lexicon.he.len(),
            "lexicon loaded"
        );
        Ok(lexicon)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, LexiconError> {
        let file: LexiconFile = serde_json::from_str(raw)?;
        match (file.pairs.is_empty(), file.en.is_empty() && file.he.is_empty()) {
            (true, _) => Self::new(file.en, file.he),
            (false, true) => Self::from_pairs(file.pairs),
            (false, false) => Err(LexiconError::MixedFormat),
        }
    }

    /// Terms of `lang`, in lexicon order.
    pub fn candidates(&self, lang: Language) -> impl Iterator<Item = &Term> {
        self.entries(lang).iter().map(|e| &e.term)
    }

    pub fn counterpart(&self, term: &Term) -> Option<&Term> {
        self.entries(term.lang())
            .iter()
            .find(|e| e.term.text() == term.text())
            .map(|e| &e.counterpart)
    }

    pub fn len(&self, lang: Language) -> usize {
        self.entries(lang).len()
    }

    pub fn is_empty(&self, lang: Language) -> bool {
        self.entries(lang).is_empty()
    }

    fn entries(&self, lang: Language) -> &[Entry] {
        match lang {
            Language::En => &self.en,
            Language::He => &self.he,
        }
    }
}

impl Default for BilingualLexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

fn build_entries<S: Into<String>>(
    lang: Language,
    mapping: impl IntoIterator<Item = (S, S)>,
) -> Result<Vec<Entry>, LexiconError> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for (term, counterpart) in mapping {
        let term: String = term.into();
        let counterpart: String = counterpart.into();
        if term.trim().is_empty() || counterpart.trim().is_empty() {
            return Err(LexiconError::EmptyTerm(lang));
        }
        if detect_language(&term) != lang {
            return Err(LexiconError::WrongLanguage { lang, term });
        }
        if detect_language(&counterpart) != lang.opposite() {
            return Err(LexiconError::WrongLanguage {
                lang: lang.opposite(),
                term: counterpart,
            });
        }
        if !seen.insert(term.clone()) {
            return Err(LexiconError::DuplicateTerm { lang, term });
        }
        entries.push(Entry {
            term: Term::new(term, lang),
            counterpart: Term::new(counterpart, lang.opposite()),
        });
    }
    Ok(entries)
}

fn entries_unchecked<'a>(
    lang: Language,
    mapping: impl Iterator<Item = (&'a str, &'a str)>,
) -> Vec<Entry> {
    mapping
        .map(|(term, counterpart)| Entry {
            term: Term::new(term, lang),
            counterpart: Term::new(counterpart, lang.opposite()),
        })
        .collect()
}
