use clap::Parser;
use tracing::{info, Instrument};

mod run;

use run::DigestRun;

const DEFAULT_LOG_FILTER: &str =
    "digest_runner=info,digest_discord=info,digest_agent=info,digest_core=info";

/// Summarize today's Discord activity and post it to a webhook.
#[derive(Debug, Parser)]
#[command(name = "digest-runner", version)]
struct Cli {
    /// Path to the TOML config (default: $DIGEST_CONFIG, then ./digest.toml).
    #[arg(long)]
    config: Option<String>,

    /// Print the digest instead of posting it.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so RUST_LOG and credentials placed there are visible below
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > DIGEST_CONFIG env > ./digest.toml
    let config_path = cli.config.or_else(|| std::env::var("DIGEST_CONFIG").ok());
    let config = digest_core::DigestConfig::load(config_path.as_deref())?;
    let prompt = digest_agent::PromptTemplate::load(&config.summarizer.prompt_path)?;

    let run = DigestRun::from_config(&config, prompt).dry_run(cli.dry_run);
    let run_id = uuid::Uuid::now_v7();
    let summary = run
        .execute()
        .instrument(tracing::info_span!("run", %run_id))
        .await?;

    info!(
        %run_id,
        channels = summary.channels_scanned,
        messages = summary.messages_collected,
        newly_blocked = summary.newly_blocked,
        digest_chars = summary.digest.as_ref().map(|d| d.chars().count()).unwrap_or(0),
        chunks_sent = summary.delivery.map(|d| d.sent).unwrap_or(0),
        chunks_failed = summary.delivery.map(|d| d.failed).unwrap_or(0),
        "digest run finished"
    );
    Ok(())
}
