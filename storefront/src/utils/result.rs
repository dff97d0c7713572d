//! Unified Result Types
//!
//! Provides type aliases for commonly used Result types across the engine

use crate::utils::AppError;

/// Application-level Result type
pub type AppResult<T> = Result<T, AppError>;
