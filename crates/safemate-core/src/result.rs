//! Convenience result type alias for SafeMate.

use crate::error::AppError;

/// A specialized `Result` type for SafeMate operations.
pub type AppResult<T> = Result<T, AppError>;
