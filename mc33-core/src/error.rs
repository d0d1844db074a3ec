//! Error types for mc33

use thiserror::Error;

/// Main error type for mc33 operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Case table error: {0}")]
    CaseTable(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for mc33 operations
pub type Result<T> = std::result::Result<T, Error>;
