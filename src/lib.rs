#[macro_use]
extern crate tracing;

pub mod logging;
pub mod runner;
pub mod sink;

pub use logging::log_init;
pub use runner::run;
pub use sink::OutputAccumulator;
