//! Error types for shell and file primitives

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised inside a primitive task; they become the task's failure output
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read output of `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit; `output` holds everything the command printed
    #[error("{output}")]
    Failed { code: Option<i32>, output: String },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    pub(crate) fn failed(code: Option<i32>, lines: &[String]) -> Self {
        let output = if lines.is_empty() {
            match code {
                Some(code) => format!("Command exited with code {}", code),
                None => "Command was terminated by a signal".to_string(),
            }
        } else {
            lines.join("\n")
        };
        ExecError::Failed { code, output }
    }
}
