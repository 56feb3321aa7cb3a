//! Reporting sink the engine emits lifecycle events to

use std::sync::{Mutex, PoisonError};

use crate::result::TaskStatus;
use crate::task::{TaskDetails, TaskId, TaskKind};

/// Snapshot of a task handed to a [`Reporter`]
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEvent {
    pub id: TaskId,
    pub name: String,
    pub kind: TaskKind,
    /// Live ordinal prefix at the time of the event, possibly empty
    pub prefix: String,
    pub status: TaskStatus,
    pub details: TaskDetails,
}

/// Pluggable formatter for task lifecycle events.
///
/// The engine guarantees exactly one `start` and one terminal event
/// (`finish` or `error`) per non-silent task, with `output` lines in between.
pub trait Reporter: Send + Sync {
    fn start(&self, event: &TaskEvent);

    fn finish(&self, event: &TaskEvent);

    fn error(&self, event: &TaskEvent, message: &str);

    fn output(&self, event: &TaskEvent, line: &str, is_error: bool);

    /// Free-form message from user code (`say` / `yell`)
    fn say(&self, _message: &str, _loud: bool) {}
}

/// Reporter that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn start(&self, _event: &TaskEvent) {}
    fn finish(&self, _event: &TaskEvent) {}
    fn error(&self, _event: &TaskEvent, _message: &str) {}
    fn output(&self, _event: &TaskEvent, _line: &str, _is_error: bool) {}
}

/// One event captured by [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    Start(TaskEvent),
    Finish(TaskEvent),
    Error(TaskEvent, String),
    Output(TaskEvent, String, bool),
    Say(String, bool),
}

impl RecordedEvent {
    pub fn task_name(&self) -> Option<&str> {
        match self {
            RecordedEvent::Start(e)
            | RecordedEvent::Finish(e)
            | RecordedEvent::Error(e, _)
            | RecordedEvent::Output(e, _, _) => Some(&e.name),
            RecordedEvent::Say(..) => None,
        }
    }
}

/// Reporter that keeps every event in memory, for tests
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events belonging to one task name, in emission order
    pub fn events_for(&self, name: &str) -> Vec<RecordedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.task_name() == Some(name))
            .collect()
    }

    fn push(&self, event: RecordedEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl Reporter for RecordingReporter {
    fn start(&self, event: &TaskEvent) {
        self.push(RecordedEvent::Start(event.clone()));
    }

    fn finish(&self, event: &TaskEvent) {
        self.push(RecordedEvent::Finish(event.clone()));
    }

    fn error(&self, event: &TaskEvent, message: &str) {
        self.push(RecordedEvent::Error(event.clone(), message.to_string()));
    }

    fn output(&self, event: &TaskEvent, line: &str, is_error: bool) {
        self.push(RecordedEvent::Output(event.clone(), line.to_string(), is_error));
    }

    fn say(&self, message: &str, loud: bool) {
        self.push(RecordedEvent::Say(message.to_string(), loud));
    }
}
