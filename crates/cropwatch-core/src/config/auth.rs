//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Connection authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key used to verify signed session tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Signing algorithm name (`HS256`, `HS384`, `HS512`).
    #[serde(default = "default_jwt_algorithm")]
    pub jwt_algorithm: String,
    /// Allowed clock skew when validating `exp`, in seconds.
    #[serde(default = "default_leeway")]
    pub jwt_leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_algorithm: default_jwt_algorithm(),
            jwt_leeway_seconds: default_leeway(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

fn default_leeway() -> u64 {
    5
}
