//! File writing primitive

use std::path::PathBuf;

use bunosh_core::{TaskEngine, TaskKind, TaskOptions, TaskResult, TaskScope};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::ExecError;

/// Content to write as a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub path: PathBuf,
    pub content: String,
    /// Append instead of replacing existing content
    pub append: bool,
}

impl WriteRequest {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            append: false,
        }
    }

    pub fn appending(mut self) -> Self {
        self.append = true;
        self
    }
}

/// Write a file, creating missing parent directories. Output is the path.
pub async fn write_to_file(engine: &TaskEngine, request: WriteRequest) -> TaskResult {
    let name = format!("writeToFile {}", request.path.display());
    engine
        .run_with(name, TaskOptions::kind(TaskKind::WriteFile), move |scope| {
            write(scope, request)
        })
        .await
}

async fn write(scope: TaskScope, request: WriteRequest) -> Result<String, ExecError> {
    let WriteRequest {
        path,
        content,
        append,
    } = request;
    let write_error = |source: std::io::Error| ExecError::Write {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(&path)
        .await
        .map_err(write_error)?;
    file.write_all(content.as_bytes())
        .await
        .map_err(write_error)?;
    file.flush().await.map_err(write_error)?;

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    scope.output(&format!("{} bytes written", content.len()));
    Ok(path.display().to_string())
}
