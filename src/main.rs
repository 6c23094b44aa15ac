use clap::Parser;
use color_eyre::Result;
use eyre::Context as _;
use logstash_gatherer::{
    log_init,
    run,
    OutputAccumulator,
};
use logstash_gatherer_config::{
    Args,
    Config,
};
use logstash_stats_gatherer::Orchestrator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    log_init(args.verbose)?;

    let once = args.once;
    let format = args.format;
    let config = Config::new(args).wrap_err("Failed to load configuration")?;
    tracing::debug!(servers = ?config.servers, interval = ?config.interval, "Loaded configuration");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "Cannot listen for Ctrl-C");
                return;
            }
            tracing::info!("Received Ctrl-C, stopping");
            cancel.cancel();
        }
    });

    let sink = Arc::new(OutputAccumulator::stdout(format));
    run(Orchestrator::new(config), sink, once, cancel).await
}
