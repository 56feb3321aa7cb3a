//! JavaScript execution errors

use bunosh_core::CallError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsExecutionError {
    /// The engine rejected the script source
    #[error("Compile error: {0}")]
    CompileError(String),

    /// Top-level script code threw while loading
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    /// The invoked function threw or its promise rejected
    #[error("{0}")]
    Thrown(String),

    /// The function's promise never settled
    #[error("Function '{0}' did not complete")]
    Incomplete(String),

    #[error("Context error: {0}")]
    ContextError(String),

    #[error("Invalid output format: {0}")]
    InvalidOutputFormat(String),
}

impl From<JsExecutionError> for CallError {
    fn from(err: JsExecutionError) -> Self {
        CallError::Failed(err.to_string())
    }
}
