//! # Collectors Module
//!
//! - **`publishers`**: one publisher per statistics category, mapping a
//!   decoded status document onto metric records
//! - **`Orchestrator`**: drives a collection cycle, fetching every configured
//!   node concurrently and fanning each document out to the publishers

pub mod orchestrator;
pub mod publishers;

pub use orchestrator::Orchestrator;
pub use publishers::publish;
