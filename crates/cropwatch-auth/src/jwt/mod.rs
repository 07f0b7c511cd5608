//! Signed session token encoding, decoding, and claims.

pub mod claims;
pub mod decoder;
pub mod encoder;

pub use claims::Claims;
pub use decoder::JwtDecoder;
pub use encoder::JwtEncoder;

use std::str::FromStr;

use jsonwebtoken::Algorithm;

use cropwatch_core::error::AppError;

/// Parses the configured algorithm name; only HMAC algorithms are accepted
/// because the key is a shared secret.
pub(crate) fn parse_algorithm(name: &str) -> Result<Algorithm, AppError> {
    let algorithm = Algorithm::from_str(name)
        .map_err(|_| AppError::configuration(format!("Unknown JWT algorithm '{name}'")))?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => Err(AppError::configuration(format!(
            "JWT algorithm {other:?} needs a key pair; only HS256/HS384/HS512 are supported"
        ))),
    }
}
