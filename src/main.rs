use std::process::ExitCode;

use clap::Parser;
use semtrans::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("semtrans=warn".parse()?),
        )
        .init();

    cli::run(Cli::parse())
        .await
        .inspect_err(|e| tracing::error!("semtrans failed: {e}"))
}
