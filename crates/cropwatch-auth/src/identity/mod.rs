//! Token → identity resolution for realtime connections.

pub mod resolver;

pub use resolver::{Identity, IdentityResolver, UserIdentity};
