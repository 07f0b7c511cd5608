//! # cropwatch-service
//!
//! The alert fanout pipeline:
//!
//! - `geo`: great-circle distance, proximity search, crop relevance
//! - `notification`: per-recipient notification composition and storage
//! - `alert`: the orchestration step run when an alert is created

pub mod alert;
pub mod geo;
pub mod notification;

pub use alert::fanout::{AlertFanoutOrchestrator, FanoutReport};
pub use geo::proximity::ProximitySearch;
pub use geo::relevance::filter_by_crop;
pub use notification::composer::NotificationComposer;
