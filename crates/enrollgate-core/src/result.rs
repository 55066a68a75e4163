//! Convenience result type alias for EnrollGate.

use crate::error::AppError;

/// A specialized `Result` type for EnrollGate operations.
pub type AppResult<T> = Result<T, AppError>;
