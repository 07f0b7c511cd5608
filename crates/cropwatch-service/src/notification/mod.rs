//! Per-recipient notification construction.

pub mod composer;

pub use composer::NotificationComposer;
