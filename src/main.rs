use anyhow::Result;
use tokio::sync::watch;

use signal_edge::config::Config;
use signal_edge::runtime::{run_scheduler, EngineContext};

#[tokio::main]
async fn main() -> Result<()> {
    // Load config
    let config = match Config::load_or_default() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Set SIGNAL_EDGE_CONFIG or fix config/default.toml");
            std::process::exit(1);
        }
    };

    // Init tracing (JSON lines to a file)
    let log_file = std::fs::File::create("signal-edge.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .level
                    .parse()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .json()
        .init();

    let intervals = config.scheduler.intervals_ms()?;
    tracing::info!(
        learning_db = %config.storage.learning_db_path.display(),
        price_feed = %config.storage.price_feed_path.display(),
        event_feed = %config.storage.event_feed_path.display(),
        threshold = config.entry.confidence_threshold,
        "Starting signal-edge"
    );

    let ctx = EngineContext::open(config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ctrl_c_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Ctrl+C received, shutting down");
        let _ = ctrl_c_shutdown.send(true);
    });

    let ctx = run_scheduler(ctx, intervals, shutdown_rx).await?;
    let pending = ctx.ledger().pending()?.len();
    tracing::info!(pending, weights = ?ctx.weights().to_map(), "Shutdown complete");
    Ok(())
}
