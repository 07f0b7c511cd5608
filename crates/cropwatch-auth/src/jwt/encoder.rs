//! Signed session token issuing.
//!
//! The account service issues production tokens; this encoder exists for
//! operator tooling and tests that need a token the decoder will accept.

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};

use cropwatch_core::config::AuthConfig;
use cropwatch_core::error::AppError;
use cropwatch_core::types::UserId;

use super::claims::Claims;
use super::parse_algorithm;

/// Creates signed session tokens with the configured secret and algorithm.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Header carrying the configured algorithm.
    header: Header,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("algorithm", &self.header.alg)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Result<Self, AppError> {
        let algorithm = parse_algorithm(&config.jwt_algorithm)?;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            header: Header::new(algorithm),
        })
    }

    /// Issues an access token for `user_id` valid for `ttl_seconds`.
    pub fn issue(&self, user_id: UserId, ttl_seconds: i64) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        self.encode(&Claims {
            user_id,
            exp: now + ttl_seconds,
            iat: Some(now),
            token_type: Some("access".to_string()),
        })
    }

    /// Signs arbitrary claims.
    pub fn encode(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&self.header, claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))
    }
}
