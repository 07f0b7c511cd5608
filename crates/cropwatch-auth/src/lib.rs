//! # cropwatch-auth
//!
//! Resolves the token presented on a realtime connection to a user.
//!
//! ## Modules
//!
//! - `jwt`: signed session token claims, decoding, and issuing
//! - `identity`: static-token then signed-token identity resolution

pub mod identity;
pub mod jwt;

pub use identity::{Identity, IdentityResolver, UserIdentity};
pub use jwt::{Claims, JwtDecoder, JwtEncoder};
