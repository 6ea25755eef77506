//! Meaning-based English/Hebrew word translation.
//!
//! The core is [`matcher::match_term`]: detect the input language, embed the
//! input and every opposite-language lexicon term, and return the closest
//! term by cosine similarity. [`generate`] holds the language-model
//! translators offered as alternative strategies.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod generate;
pub mod lang;
pub mod lexicon;
pub mod matcher;
pub mod strategy;

pub const USER_AGENT: &str = concat!("semtrans/", env!("CARGO_PKG_VERSION"));
