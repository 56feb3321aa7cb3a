//! Task status and result model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task has started and not yet settled
    Running,
    /// Task settled successfully
    Success,
    /// Task failed
    Fail,
    /// Task failed inside a `try` block and was downgraded
    Warning,
}

impl TaskStatus {
    /// Check if the status is final
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Fail => "fail",
            TaskStatus::Warning => "warning",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a settled task.
///
/// Built only through [`TaskResult::success`], [`TaskResult::fail`] and
/// [`TaskResult::warning`], so the status is never `Running`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult {
    status: TaskStatus,
    output: Value,
}

impl TaskResult {
    pub fn success(output: impl Into<Value>) -> Self {
        Self {
            status: TaskStatus::Success,
            output: output.into(),
        }
    }

    pub fn fail(output: impl Into<Value>) -> Self {
        Self {
            status: TaskStatus::Fail,
            output: output.into(),
        }
    }

    pub fn warning(output: impl Into<Value>) -> Self {
        Self {
            status: TaskStatus::Warning,
            output: output.into(),
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn output(&self) -> &Value {
        &self.output
    }

    pub fn into_output(self) -> Value {
        self.output
    }

    /// Output rendered as text; strings are returned without quotes
    pub fn output_text(&self) -> String {
        match &self.output {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn has_succeeded(&self) -> bool {
        self.status == TaskStatus::Success
    }

    pub fn has_failed(&self) -> bool {
        self.status == TaskStatus::Fail
    }

    pub fn has_warning(&self) -> bool {
        self.status == TaskStatus::Warning
    }
}
