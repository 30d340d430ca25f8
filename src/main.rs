use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use volpipe::config::Settings;
use volpipe::execution::action_sink::{BroadcastActionSink, PublishedActions};
use volpipe::scenario::modes::ModeKind;
use volpipe::scenario::scenario::Scenario;

#[derive(Debug, Clone, Parser)]
struct Args {
    #[arg(long, default_value = Settings::FILE_NAME)]
    pub config: PathBuf,

    /// Overrides `mode` from the settings file.
    #[arg(long, value_enum)]
    pub mode: Option<ModeKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("volpipe=debug".parse()?))
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let mut settings = Settings::load(&args.config)?.clone();
    if let Some(mode) = args.mode {
        settings.mode = mode;
    }

    info!(
        mode = %settings.mode,
        instruments = ?settings.instruments,
        dispatch = %settings.engine.signal_dispatch,
        "starting volpipe"
    );

    let (published_sender, _) = broadcast::channel::<PublishedActions>(10_000);
    let mut published_log_receiver = published_sender.subscribe();

    tokio::spawn(async move {
        loop {
            match published_log_receiver.recv().await {
                Ok(published) => {
                    for action in &published.actions {
                        info!(
                            timestamp = %published.timestamp,
                            %action,
                            metadata = ?action.metadata,
                            "published action"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged = n, "action logger lagged; dropped messages");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let (engine, broker) = Scenario::engine(&settings).await?;
    let mut engine = engine.with_sink(Box::new(BroadcastActionSink::new(published_sender)));

    let summary = engine.run().await?;

    let positions = broker.shared().positions().await?;
    info!(
        ticks = summary.ticks,
        actions = summary.actions_published,
        open_positions = positions.iter().filter(|p| p.quantity != 0).count(),
        "volpipe finished"
    );

    Ok(())
}
