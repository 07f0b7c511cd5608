//! Inbound frame validation and parsing.

use serde_json::Value;

use cropwatch_core::error::{AppError, ErrorKind};

use super::types::InboundMessage;

/// Maximum accepted inbound frame size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 65_536;

/// Reply text for frames that are not JSON.
pub const INVALID_JSON: &str = "Invalid JSON format";

/// Rejects frames over [`MAX_MESSAGE_SIZE`].
pub fn validate_inbound(raw: &str) -> Result<(), AppError> {
    if raw.len() > MAX_MESSAGE_SIZE {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {MAX_MESSAGE_SIZE} bytes"
        )));
    }
    Ok(())
}

/// Parses a text frame.
///
/// Returns `Err` only when the frame is not JSON. Valid JSON with an
/// unknown or missing `type` yields `Ok(None)`.
pub fn parse_inbound(raw: &str) -> Result<Option<InboundMessage>, AppError> {
    validate_inbound(raw)?;
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::with_source(ErrorKind::Validation, INVALID_JSON, e))?;
    Ok(serde_json::from_value(value).ok())
}
