//! Core error types

use thiserror::Error;

/// Error returned when a bound command function cannot be called or fails
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallError {
    /// The function ran and raised an error
    #[error("{0}")]
    Failed(String),

    /// Arguments could not be converted for the call
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The function could not be reached (runtime missing, not exported)
    #[error("Function unavailable: {0}")]
    Unavailable(String),
}
