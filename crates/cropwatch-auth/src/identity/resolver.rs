//! Resolves a connection token to a user, falling back to anonymous.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use cropwatch_core::types::UserId;
use cropwatch_entity::traits::{ApiTokenStore, UserDirectory};

use crate::jwt::JwtDecoder;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    /// User ID.
    pub id: UserId,
    /// Username, for greetings and logs.
    pub username: String,
}

/// The outcome of resolving a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The token belongs to a known user.
    User(UserIdentity),
    /// No token, or a token nobody owns.
    Anonymous,
}

impl Identity {
    /// Whether resolution failed.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// The resolved user, if any.
    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            Self::User(user) => Some(user),
            Self::Anonymous => None,
        }
    }
}

/// Tries a static API token lookup, then a signed session token.
///
/// Failures of either step (unknown token, bad signature, expired token,
/// user missing from the directory, backend errors) never propagate: they
/// resolve to [`Identity::Anonymous`].
#[derive(Clone)]
pub struct IdentityResolver {
    /// Static API token lookup.
    tokens: Arc<dyn ApiTokenStore>,
    /// Signed session token verification.
    decoder: JwtDecoder,
    /// Subject → user lookup.
    directory: Arc<dyn UserDirectory>,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("decoder", &self.decoder)
            .finish()
    }
}

impl IdentityResolver {
    /// Creates a resolver over the given token store, decoder and directory.
    pub fn new(
        tokens: Arc<dyn ApiTokenStore>,
        decoder: JwtDecoder,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            tokens,
            decoder,
            directory,
        }
    }

    /// Resolves an optional token; `None` or blank is anonymous.
    pub async fn resolve_optional(&self, token: Option<&str>) -> Identity {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => self.resolve_identity(token).await,
            None => Identity::Anonymous,
        }
    }

    /// Resolves `token` to an identity.
    pub async fn resolve_identity(&self, token: &str) -> Identity {
        match self.tokens.find_user(token).await {
            Ok(Some(user_id)) => return self.load_user(user_id, "api_token").await,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "API token lookup failed, trying session token"),
        }

        match self.decoder.decode(token) {
            Ok(claims) => self.load_user(claims.user_id, "session_token").await,
            Err(e) => {
                debug!(error = %e, "Session token rejected");
                Identity::Anonymous
            }
        }
    }

    async fn load_user(&self, user_id: UserId, method: &'static str) -> Identity {
        match self.directory.get_user(user_id).await {
            Ok(Some(user)) => {
                debug!(user_id = %user_id, method, "Token resolved");
                Identity::User(UserIdentity {
                    id: user.id,
                    username: user.username,
                })
            }
            Ok(None) => {
                debug!(user_id = %user_id, method, "Token subject not in directory");
                Identity::Anonymous
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User lookup failed during authentication");
                Identity::Anonymous
            }
        }
    }
}
