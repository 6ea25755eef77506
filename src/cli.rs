use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use reqwest::Client;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::embedding::{CachedEmbedder, EmbeddingProvider, OllamaEmbedder};
use crate::generate::{OllamaClient, OpenAiClient};
use crate::lexicon::BilingualLexicon;
use crate::strategy::{Generator, TranslateError, Translation, TranslationStrategy};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StrategyKind {
    /// Closest term in the built-in (or --lexicon) vocabulary, by embedding similarity
    #[default]
    Match,
    /// Free-form translation by a local Ollama model
    Ollama,
    /// Free-form translation by the OpenAI chat API
    Openai,
}

/// Translate an English or Hebrew word or phrase by meaning.
#[derive(Debug, Parser)]
#[command(name = "semtrans", version)]
pub struct Cli {
    /// Word or phrase to translate; multiple words are joined by spaces
    #[arg(required_unless_present = "interactive")]
    pub phrase: Vec<String>,

    /// Translation strategy
    #[arg(short, long, value_enum, default_value_t)]
    pub strategy: StrategyKind,

    /// Model name: embedding model for `match`, generation model otherwise
    /// (ollama: mistral, llama3, gemma:2b, mixtral)
    #[arg(short, long)]
    pub model: Option<String>,

    /// JSON lexicon to match against instead of the built-in one
    #[arg(long, value_name = "PATH")]
    pub lexicon: Option<PathBuf>,

    /// Cache embeddings for the lifetime of the process
    #[arg(long)]
    pub cache: bool,

    /// Read one phrase per line from stdin until EOF
    #[arg(short, long)]
    pub interactive: bool,
}

impl Cli {
    pub fn phrase(&self) -> String {
        self.phrase.join(" ")
    }
}

pub async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;

    let model = cli.model.as_deref();
    match cli.strategy {
        StrategyKind::Match => {
            let lexicon = match &cli.lexicon {
                Some(path) => BilingualLexicon::from_json_file(path)?,
                None => BilingualLexicon::builtin(),
            };
            let embedder = OllamaEmbedder::from_env(http, model)?;
            info!(model = embedder.model(), cache = cli.cache, "embedding provider ready");
            if cli.cache {
                let embedder = CachedEmbedder::new(embedder);
                execute(&cli, TranslationStrategy::NearestCandidateMatch { lexicon, embedder }).await
            } else {
                execute(&cli, TranslationStrategy::NearestCandidateMatch { lexicon, embedder }).await
            }
        }
        StrategyKind::Ollama | StrategyKind::Openai => {
            if cli.lexicon.is_some() || cli.cache {
                warn!("--lexicon and --cache only apply to the match strategy");
            }
            let generator = if cli.strategy == StrategyKind::Ollama {
                Generator::Ollama(OllamaClient::from_env(http, model)?)
            } else {
                Generator::OpenAi(OpenAiClient::from_env(http, model)?)
            };
            info!(model = generator.model(), "generator ready");
            let strategy: TranslationStrategy<OllamaEmbedder> =
                TranslationStrategy::GenerationBacked(generator);
            execute(&cli, strategy).await
        }
    }
}

async fn execute<E: EmbeddingProvider>(
    cli: &Cli,
    strategy: TranslationStrategy<E>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if cli.interactive {
        let stdin = BufReader::new(tokio::io::stdin());
        interactive(&strategy, stdin, &mut std::io::stdout(), &mut std::io::stderr()).await?;
        return Ok(ExitCode::SUCCESS);
    }

    match strategy.translate(&cli.phrase()).await {
        Ok(translation) => {
            println!("{}", format_translation(&translation));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Line-oriented front-end: every Enter translates the line; errors are
/// shown and the loop keeps going until `input` is exhausted.
async fn interactive<E, R, O, W>(
    strategy: &TranslationStrategy<E>,
    input: R,
    out: &mut O,
    err: &mut W,
) -> std::io::Result<()>
where
    E: EmbeddingProvider,
    R: AsyncBufRead + Unpin,
    O: Write,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(out, "Enter word or phrase: ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            return Ok(());
        };
        match strategy.translate(&line).await {
            Ok(translation) => writeln!(out, "{}", format_translation(&translation))?,
            Err(e @ TranslateError::EmptyInput) => writeln!(err, "{e}")?,
            Err(e) => writeln!(err, "Translation error: {e}")?,
        }
    }
}

pub fn format_translation(translation: &Translation) -> String {
    let text = &translation.text;
    match (translation.score, &translation.paired_with) {
        (Some(score), Some(pair)) => {
            format!("Semantic translation: {text} (similarity {score:.3}, paired with {pair})")
        }
        (Some(score), None) => format!("Semantic translation: {text} (similarity {score:.3})"),
        (None, _) => format!("Semantic translation: {text}"),
    }
}
