use crate::sink::OutputAccumulator;
use eyre::{
    ensure,
    Result,
};
use logstash_stats_gatherer::{
    Accumulator,
    Orchestrator,
};
use std::{
    io::Write,
    sync::Arc,
    time::Instant,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Runs one cycle, or cycles every configured interval until cancelled.
pub async fn run<W: Write + Send + 'static>(
    orchestrator: Orchestrator,
    sink: Arc<OutputAccumulator<W>>,
    once: bool,
    cancel: CancellationToken,
) -> Result<()> {
    if once {
        cycle(&orchestrator, &sink).await;
        return Ok(());
    }

    let interval = orchestrator.config().interval;
    ensure!(!interval.is_zero(), "interval must be greater than zero");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(?interval, "Collecting periodically");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                cycle(&orchestrator, &sink).await;
            }
        }
    }

    info!("Collection stopped");
    Ok(())
}

/// Runs one collection cycle and returns the number of errors it reported.
async fn cycle<W: Write + Send + 'static>(orchestrator: &Orchestrator, sink: &Arc<OutputAccumulator<W>>) -> usize {
    let started = Instant::now();
    let accumulator: Arc<dyn Accumulator> = sink.clone();
    orchestrator.collect(accumulator).await;
    let errors = sink.take_error_count();
    if errors > 0 {
        warn!(errors, elapsed = ?started.elapsed(), "Collection cycle finished with errors");
    } else {
        debug!(elapsed = ?started.elapsed(), "Collection cycle finished");
    }
    errors
}
