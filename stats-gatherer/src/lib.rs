//! # Logstash Stats Gatherer
//!
//! Polls the node stats API of one or more Logstash instances and republishes
//! the JVM, process, pipeline and event statistics as metric records.
//!
//! ## Architecture
//!
//! - **`model`**: typed, version tolerant view of the node stats document
//! - **`target`** / **`client`**: per node connection settings and the HTTP
//!   client performing a single fetch
//! - **`collectors`**: category publishers and the `Orchestrator` that runs
//!   a collection cycle across all nodes
//! - **`accumulator`**: the sink records and errors are written to
//!
//! ## Usage
//!
//! ```no_run
//! use logstash_gatherer_config::Config;
//! use logstash_stats_gatherer::{
//!     MemoryAccumulator,
//!     Orchestrator,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let config = Config {
//!     servers: vec!["http://localhost:9600".to_string()],
//!     ..Config::default()
//! };
//! let accumulator = Arc::new(MemoryAccumulator::new());
//! Orchestrator::new(config).collect(accumulator.clone()).await;
//! for metric in accumulator.metrics() {
//!     println!("{metric}");
//! }
//! # }
//! ```

pub mod accumulator;
pub mod client;
pub mod collectors;
pub mod error;
pub mod model;
pub mod target;

#[cfg(test)]
mod testing;

pub use accumulator::{
    Accumulator,
    FieldValue,
    Fields,
    MemoryAccumulator,
    Metric,
    Tags,
};
pub use client::ApiClient;
pub use collectors::*;
pub use error::CollectError;
pub use model::StatusDocument;
pub use target::Target;
