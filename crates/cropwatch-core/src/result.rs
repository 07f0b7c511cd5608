//! Convenience result type alias for CropWatch.

use crate::error::AppError;

/// A specialized `Result` type for CropWatch operations.
pub type AppResult<T> = Result<T, AppError>;
