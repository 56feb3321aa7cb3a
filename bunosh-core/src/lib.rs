//! Core domain models for bunosh
//!
//! This crate holds the task result model, the task execution engine with
//! its concurrency tracker, and the command model the CLI is built from.
//! It has no knowledge of JavaScript, processes or HTTP; those live in the
//! primitive crates and talk to the engine through [`TaskEngine`].

pub mod command;
pub mod engine;
pub mod error;
pub mod naming;
pub mod reporter;
pub mod result;
pub mod runtime;
pub mod task;
pub mod tracker;

// Re-export commonly used types at the crate root
pub use command::{ArgSpec, BoundFunction, Command, CommandKind, Literal, OptionSpec, NPM_NAMESPACE};
pub use engine::{ActiveTask, FailureMode, TaskEngine, TaskOptions, TaskScope};
pub use error::CallError;
pub use naming::kebab_case;
pub use reporter::{NullReporter, RecordedEvent, RecordingReporter, Reporter, TaskEvent};
pub use result::{TaskResult, TaskStatus};
pub use runtime::{RunSummary, RuntimeContext, RuntimeOptions};
pub use task::{infer_task_name, TaskDetails, TaskId, TaskInfo, TaskKind};
pub use tracker::RunningTasks;
