//! Per-user delivery groups.

pub mod group;
pub mod registry;

pub use group::GroupKey;
pub use registry::{GroupRegistry, MemoryGroupRegistry};
