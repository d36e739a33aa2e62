use anyhow::Context;
use clap::Parser;
use httpwrap::document::{RequestDocument, ResponseDocument};
use httpwrap::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Sends the request described by a JSON file and prints the response as JSON.
#[derive(Debug, Parser)]
#[command(name = "httpwrap", version, about)]
struct Cli {
    /// JSON file with Method, URL, URLParams, Headers and Body
    file: PathBuf,

    /// Maximum number of attempts
    #[arg(long, env = "HTTPWRAP_RETRIES", default_value_t = 2)]
    retries: usize,

    /// Delay between attempts, in milliseconds
    #[arg(long, env = "HTTPWRAP_RETRY_DELAY_MS", default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Timeout of each attempt, in seconds
    #[arg(long, env = "HTTPWRAP_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut builder = Client::builder()
        .retries(cli.retries)
        .retry_delay(Duration::from_millis(cli.retry_delay_ms))
        .cookie_store(true);
    if let Some(secs) = cli.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build()?;

    let data = std::fs::read(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let message = RequestDocument::from_slice(&data)
        .with_context(|| format!("failed to parse {}", cli.file.display()))?
        .into_message();

    let response = client
        .process_message(&message)
        .await?
        .context("no attempt was made (retries is 0)")?;

    println!("{}", ResponseDocument::from(response).to_pretty_string()?);
    Ok(())
}
