//! Error types for Cabbage core.

use thiserror::Error;

/// Main error type for Cabbage core operations.
#[derive(Error, Debug)]
pub enum CabbageError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for Cabbage core operations.
pub type Result<T> = std::result::Result<T, CabbageError>;
