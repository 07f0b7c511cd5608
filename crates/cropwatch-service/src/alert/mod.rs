//! Alert lifecycle hooks.

pub mod fanout;

pub use fanout::{AlertFanoutOrchestrator, FanoutReport};
