//! mailsink: polls a mailbox and sinks qualifying attachments to disk.
//!
//! Intended to be re-invoked by an external scheduler; one invocation is one
//! pipeline run.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mailsink::{
    load_allow_list, load_settings, AttachmentProcessor, GraphMailClient, MailsinkError,
    ProcessingResult, TokenManager,
};

#[derive(Parser, Debug)]
#[command(name = "mailsink", version, about = "Mailbox attachment ingestion service")]
struct Cli {
    /// Path to the settings file.
    #[arg(long, value_name = "FILE", env = "MAILSINK_CONFIG", default_value = "mailsink.json")]
    config: PathBuf,

    /// Path to the allowed-senders file.
    #[arg(
        long,
        value_name = "FILE",
        env = "MAILSINK_ALLOW_LIST",
        default_value = "allowed_senders.json"
    )]
    allow_list: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Starting mailsink v{}", env!("CARGO_PKG_VERSION"));

    match run(&cli).await {
        Ok(result) => {
            info!("Processing complete");
            info!("  Emails processed:  {}", result.emails_processed);
            info!("  Attachments saved: {}", result.total_attachments);
            info!("  New downloads:     {}", result.new_downloads);
            info!("  Skipped:           {}", result.skipped_attachments);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ProcessingResult, MailsinkError> {
    let settings = load_settings(&cli.config)?;
    let allow_list = load_allow_list(&cli.allow_list)?;

    let secret = settings.client_secret()?;
    let tokens = TokenManager::new(
        &settings.tenant_id,
        &settings.client_id,
        secret,
        settings.token_url.clone(),
    )?;
    let client = GraphMailClient::new(
        &settings.target_mailbox,
        tokens,
        settings.graph_base_url.clone(),
    )?;

    let mut processor = AttachmentProcessor::new(&client, &settings);
    processor.run(&allow_list).await
}
