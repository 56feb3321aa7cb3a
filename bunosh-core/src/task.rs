//! Task identity and bookkeeping records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::result::{TaskResult, TaskStatus};

/// Longest display name derived from a function's source text
const INFERRED_NAME_LEN: usize = 50;

/// Process-unique task identifier, allocated in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// What kind of work a task wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// User-defined `task(...)` block
    Task,
    /// Shell command
    Exec,
    /// HTTP request
    Fetch,
    /// File write
    WriteFile,
    /// AI provider request
    Ai,
    /// Top-level CLI command
    Command,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Task => "task",
            TaskKind::Exec => "exec",
            TaskKind::Fetch => "fetch",
            TaskKind::WriteFile => "write_file",
            TaskKind::Ai => "ai",
            TaskKind::Command => "command",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Contextual fields reported alongside lifecycle events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskDetails {
    pub duration: Option<Duration>,
    pub exit_code: Option<i32>,
    pub status_code: Option<u16>,
}

/// Historical record of one task
#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
    pub kind: TaskKind,
    pub start_time: DateTime<Utc>,
    pub status: TaskStatus,
    pub duration: Option<Duration>,
    pub result: Option<TaskResult>,
}

impl TaskInfo {
    pub(crate) fn started(id: TaskId, name: String, kind: TaskKind) -> Self {
        Self {
            id,
            name,
            kind,
            start_time: Utc::now(),
            status: TaskStatus::Running,
            duration: None,
            result: None,
        }
    }
}

/// Derive a display name from a function's textual form.
///
/// Whitespace runs collapse to single spaces and the result is cut to a
/// short prefix.
pub fn infer_task_name(source: &str) -> String {
    let collapsed = source.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(INFERRED_NAME_LEN).collect()
}
