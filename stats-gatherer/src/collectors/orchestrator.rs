use super::publishers;
use crate::{
    accumulator::Accumulator,
    client::ApiClient,
    error::CollectError,
};
use logstash_gatherer_config::Config;
use std::{
    collections::HashMap,
    sync::Arc,
};
use tokio::{
    sync::mpsc::{
        unbounded_channel,
        UnboundedReceiver,
        UnboundedSender,
    },
    task::JoinSet,
};
use tracing::{
    debug,
    error,
    info,
    instrument,
    warn,
};

/// Runs collection cycles over every configured node.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Config,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one collection cycle.
    ///
    /// Every node is fetched in its own task and the publishers for its
    /// document run concurrently. Failures never abort the cycle; they are
    /// handed to [`Accumulator::add_error`], and all of them have been
    /// delivered by the time this returns.
    #[instrument(level = "debug", skip_all, fields(servers = self.config.servers.len()))]
    pub async fn collect(&self, accumulator: Arc<dyn Accumulator>) {
        let (errors, receiver) = unbounded_channel::<CollectError>();
        let drain = tokio::spawn(drain_errors(receiver, accumulator.clone()));

        let mut nodes = JoinSet::new();
        let mut hosts = HashMap::new();
        for address in &self.config.servers {
            let client = match ApiClient::from_config(address, &self.config) {
                Ok(client) => client,
                Err(err) => {
                    warn!(%err, "Skipping server");
                    let _ = errors.send(err);
                    continue;
                }
            };
            let host = client.target().base_url.clone();
            let handle = nodes.spawn(gather_node(client, accumulator.clone(), errors.clone()));
            hosts.insert(handle.id(), host);
        }

        while let Some(joined) = nodes.join_next_with_id().await {
            if let Err(err) = joined {
                let host = hosts.remove(&err.id()).unwrap_or_default();
                error!(%host, %err, "Node task failed");
                let _ = errors.send(CollectError::Task {
                    host,
                    reason: err.to_string(),
                });
            }
        }

        // Every producer has finished, closing the channel lets the drain end.
        drop(errors);
        if let Err(err) = drain.await {
            error!(%err, "Error drain task failed");
        }
    }
}

async fn drain_errors(mut receiver: UnboundedReceiver<CollectError>, accumulator: Arc<dyn Accumulator>) {
    while let Some(err) = receiver.recv().await {
        accumulator.add_error(err);
    }
}

/// Fetches one node and fans its document out to the selected publishers.
async fn gather_node(client: ApiClient, accumulator: Arc<dyn Accumulator>, errors: UnboundedSender<CollectError>) {
    let target = client.target();
    let document = match client.fetch_stats().await {
        Ok(document) => Arc::new(document),
        Err(err) => {
            warn!(host = %target.base_url, endpoint = err.endpoint(), %err, "Fetching node stats failed");
            let _ = errors.send(err);
            return;
        }
    };
    info!(
        host = %target.base_url,
        version = %document.version,
        schema = document.pipeline.key(),
        "Fetched node stats"
    );

    let mut tasks = JoinSet::new();
    for category in target.categories.iter().copied() {
        let document = document.clone();
        let accumulator = accumulator.clone();
        tasks.spawn(async move {
            publishers::publish(category, &document, accumulator.as_ref());
            category
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(category) => debug!(host = %target.base_url, %category, "Published"),
            Err(err) => {
                error!(host = %target.base_url, %err, "Publisher failed");
                let _ = errors.send(CollectError::Task {
                    host: target.base_url.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
}
