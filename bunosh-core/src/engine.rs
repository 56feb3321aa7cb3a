//! Task execution engine
//!
//! Wraps arbitrary async work with lifecycle tracking. Every wrapped
//! operation gets a fresh [`TaskId`], is logged in the [`RuntimeContext`]
//! history, appears in the live set while running and settles into a
//! [`TaskResult`]. Errors and panics inside the work are converted into a
//! failed result; nothing propagates to the caller.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::reporter::TaskEvent;
use crate::result::{TaskResult, TaskStatus};
use crate::runtime::RuntimeContext;
use crate::task::{TaskDetails, TaskId, TaskKind};

/// How a failure is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Failure is a FAIL and may trigger stop-on-failure
    #[default]
    Fail,
    /// Failure is downgraded to WARNING and never terminates the process
    Warn,
}

/// Per-task options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOptions {
    pub kind: TaskKind,
    pub mode: FailureMode,
    pub silent: bool,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            kind: TaskKind::Task,
            mode: FailureMode::Fail,
            silent: false,
        }
    }
}

impl TaskOptions {
    pub fn kind(kind: TaskKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: FailureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }
}

struct TaskState {
    id: TaskId,
    name: String,
    kind: TaskKind,
    silent: bool,
    ctx: Arc<RuntimeContext>,
    details: Mutex<TaskDetails>,
}

impl TaskState {
    fn event(&self, status: TaskStatus) -> TaskEvent {
        TaskEvent {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            prefix: self.ctx.prefix_for(self.id),
            status,
            details: self
                .details
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    fn output(&self, line: &str, is_error: bool) {
        if self.silent {
            return;
        }
        let event = self.event(TaskStatus::Running);
        self.ctx.reporter().output(&event, line, is_error);
    }

    fn update_details(&self, f: impl FnOnce(&mut TaskDetails)) {
        f(&mut self.details.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// Handle given to the work inside a task, for streaming output and
/// attaching details to the terminal event
#[derive(Clone)]
pub struct TaskScope {
    state: Arc<TaskState>,
}

impl TaskScope {
    pub fn id(&self) -> TaskId {
        self.state.id
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Emit one line of standard output
    pub fn output(&self, line: &str) {
        self.state.output(line, false);
    }

    /// Emit one line of error output
    pub fn error_output(&self, line: &str) {
        self.state.output(line, true);
    }

    pub fn set_exit_code(&self, code: i32) {
        self.state.update_details(|d| d.exit_code = Some(code));
    }

    pub fn set_status_code(&self, code: u16) {
        self.state.update_details(|d| d.status_code = Some(code));
    }
}

/// A started task that has not settled yet.
///
/// Used directly by primitives whose completion is driven from outside a
/// single future, like the JavaScript bridge. Dropping an unsettled task
/// records it as failed so the terminal event is never lost.
pub struct ActiveTask {
    state: Arc<TaskState>,
    mode: FailureMode,
    stop_on_failure: bool,
    started: Instant,
    settled: bool,
}

impl ActiveTask {
    pub fn id(&self) -> TaskId {
        self.state.id
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn scope(&self) -> TaskScope {
        TaskScope {
            state: self.state.clone(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Settle the task with the outcome of its work
    pub fn complete(mut self, outcome: Result<Value, String>) -> TaskResult {
        self.settle(outcome, true)
    }

    fn settle(&mut self, outcome: Result<Value, String>, allow_exit: bool) -> TaskResult {
        self.settled = true;
        let state = &self.state;
        let duration = self.started.elapsed();
        state.update_details(|d| d.duration = Some(duration));

        let (result, message) = match outcome {
            Ok(value) => (TaskResult::success(value), None),
            Err(message) => match self.mode {
                FailureMode::Fail => (TaskResult::fail(message.clone()), Some(message)),
                FailureMode::Warn => (TaskResult::warning(message.clone()), Some(message)),
            },
        };
        let status = result.status();
        state
            .ctx
            .record_completion(state.id, status, duration, result.clone());

        if !state.silent {
            let event = state.event(status);
            let reporter = state.ctx.reporter();
            match &message {
                None => reporter.finish(&event),
                Some(message) => reporter.error(&event, message),
            }
        }
        state.ctx.remove_running(state.id);

        debug!(
            "Task {} ({}) finished as {} in {:?}",
            state.id, state.name, status, duration
        );

        if status == TaskStatus::Fail && self.stop_on_failure && allow_exit {
            warn!("Stopping after failed task '{}'", state.name);
            state.ctx.exit(1);
        }
        result
    }
}

impl Drop for ActiveTask {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(Err("task was dropped before completing".to_string()), false);
        }
    }
}

/// Entry point for running tracked tasks
#[derive(Clone, Debug)]
pub struct TaskEngine {
    ctx: Arc<RuntimeContext>,
}

impl TaskEngine {
    pub fn new(ctx: Arc<RuntimeContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<RuntimeContext> {
        &self.ctx
    }

    /// Start a task and emit its start notification
    pub fn begin(&self, name: impl Into<String>, options: TaskOptions) -> ActiveTask {
        let name = name.into();
        let silent = options.silent || self.ctx.silent();
        let stop_on_failure = options.mode == FailureMode::Fail && self.ctx.stop_on_failure();
        let (id, prefix) = self.ctx.register(name.clone(), options.kind);
        debug!("Task {} ({}) started", id, name);

        let state = Arc::new(TaskState {
            id,
            name,
            kind: options.kind,
            silent,
            ctx: self.ctx.clone(),
            details: Mutex::new(TaskDetails::default()),
        });

        if !silent {
            let event = TaskEvent {
                id,
                name: state.name.clone(),
                kind: options.kind,
                prefix,
                status: TaskStatus::Running,
                details: TaskDetails::default(),
            };
            self.ctx.reporter().start(&event);
        }

        ActiveTask {
            state,
            mode: options.mode,
            stop_on_failure,
            started: Instant::now(),
            settled: false,
        }
    }

    /// Run work as a task; resolves with its result and never fails
    pub async fn run<F, Fut, T, E>(&self, name: impl Into<String>, f: F) -> TaskResult
    where
        F: FnOnce(TaskScope) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        self.run_with(name, TaskOptions::default(), f).await
    }

    /// Run work and report failure as a warning; returns whether it succeeded
    pub async fn try_run<F, Fut, T, E>(&self, name: impl Into<String>, f: F) -> bool
    where
        F: FnOnce(TaskScope) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let options = TaskOptions::default().with_mode(FailureMode::Warn);
        self.run_with(name, options, f).await.has_succeeded()
    }

    /// Run work without any notifications
    pub async fn run_silent<F, Fut, T, E>(&self, name: impl Into<String>, f: F) -> TaskResult
    where
        F: FnOnce(TaskScope) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let options = TaskOptions::default().with_silent(true);
        self.run_with(name, options, f).await
    }

    pub async fn run_with<F, Fut, T, E>(
        &self,
        name: impl Into<String>,
        options: TaskOptions,
        f: F,
    ) -> TaskResult
    where
        F: FnOnce(TaskScope) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let task = self.begin(name, options);
        let scope = task.scope();

        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(move || f(scope))) {
            Ok(future) => match AssertUnwindSafe(future).catch_unwind().await {
                Ok(Ok(value)) => serde_json::to_value(value).map_err(|e| e.to_string()),
                Ok(Err(err)) => Err(err.to_string()),
                Err(payload) => Err(panic_message(payload)),
            },
            Err(payload) => Err(panic_message(payload)),
        };

        task.complete(outcome)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{RecordedEvent, RecordingReporter};
    use serde_json::json;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn engine() -> (TaskEngine, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::new());
        let ctx = RuntimeContext::new(reporter.clone());
        (TaskEngine::new(Arc::new(ctx)), reporter)
    }

    #[tokio::test]
    async fn test_successful_task() {
        let (engine, reporter) = engine();
        let result = engine
            .run("build", |_| async { Ok::<_, String>("built") })
            .await;

        assert!(result.has_succeeded());
        assert_eq!(result.output(), &json!("built"));

        let events = reporter.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], RecordedEvent::Start(e) if e.name == "build"));
        match &events[1] {
            RecordedEvent::Finish(e) => {
                assert_eq!(e.status, TaskStatus::Success);
                assert!(e.details.duration.is_some());
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(engine.context().running_count(), 0);
    }

    #[tokio::test]
    async fn test_error_becomes_failed_result() {
        let (engine, reporter) = engine();
        let result = engine
            .run("deploy", |_| async { Err::<(), _>("connection refused") })
            .await;

        assert!(result.has_failed());
        assert_eq!(result.output(), &json!("connection refused"));
        assert!(matches!(
            reporter.events().last(),
            Some(RecordedEvent::Error(_, message)) if message == "connection refused"
        ));
    }

    #[tokio::test]
    async fn test_panic_becomes_failed_result() {
        let (engine, _) = engine();

        let result = engine
            .run("sync-panic", |_| -> std::future::Ready<Result<(), String>> {
                panic!("thrown synchronously")
            })
            .await;
        assert!(result.has_failed());
        assert_eq!(result.output(), &json!("thrown synchronously"));

        let result = engine
            .run("async-panic", |_| async {
                if true {
                    panic!("rejected later");
                }
                Ok::<(), String>(())
            })
            .await;
        assert!(result.has_failed());
        assert_eq!(result.output(), &json!("rejected later"));
    }

    #[tokio::test]
    async fn test_try_run_reports_warning() {
        let (engine, reporter) = engine();
        engine.context().set_stop_on_failure(true);

        let ok = engine
            .try_run("optional", |_| async { Err::<(), _>("nope") })
            .await;

        assert!(!ok);
        let history = engine.context().history();
        assert_eq!(history[0].status, TaskStatus::Warning);
        assert!(matches!(
            reporter.events().last(),
            Some(RecordedEvent::Error(e, _)) if e.status == TaskStatus::Warning
        ));
        assert_eq!(engine.context().exit_code(), 0);
    }

    #[tokio::test]
    async fn test_silent_task_records_history_only() {
        let (engine, reporter) = engine();
        let result = engine
            .run_silent("quiet", |scope| async move {
                scope.output("hidden");
                Ok::<_, String>(1)
            })
            .await;

        assert!(result.has_succeeded());
        assert!(reporter.events().is_empty());
        assert_eq!(engine.context().history().len(), 1);
    }

    #[tokio::test]
    async fn test_global_silence_applies_to_new_tasks_only() {
        let (engine, reporter) = engine();
        let early = engine.begin("early", TaskOptions::default());
        engine.context().set_silent(true);
        engine
            .run("late", |_| async { Ok::<_, String>(()) })
            .await;
        early.complete(Ok(Value::Null));

        let names: Vec<_> = reporter
            .events()
            .iter()
            .filter_map(|e| e.task_name().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["early", "early"]);
    }

    #[tokio::test]
    async fn test_output_carries_details_and_prefix() {
        let (engine, reporter) = engine();
        let outer = engine.begin("outer", TaskOptions::default());
        let result = engine
            .run("inner", |scope| async move {
                scope.output("line one");
                scope.error_output("warn line");
                scope.set_exit_code(0);
                Ok::<_, String>(())
            })
            .await;
        outer.complete(Ok(Value::Null));
        assert!(result.has_succeeded());

        let inner = reporter.events_for("inner");
        assert_eq!(inner.len(), 4);
        match &inner[1] {
            RecordedEvent::Output(e, line, false) => {
                assert_eq!(e.prefix, "❰2❱");
                assert_eq!(line, "line one");
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(&inner[2], RecordedEvent::Output(_, _, true)));
        assert!(matches!(&inner[3], RecordedEvent::Finish(e) if e.details.exit_code == Some(0)));
    }

    #[tokio::test]
    async fn test_stop_on_failure_invokes_exit_handler() {
        let exit_code = Arc::new(AtomicI32::new(-1));
        let captured = exit_code.clone();
        let reporter = Arc::new(RecordingReporter::new());
        let ctx = RuntimeContext::new(reporter.clone())
            .with_exit_handler(move |code| captured.store(code, Ordering::SeqCst));
        ctx.set_stop_on_failure(true);
        let engine = TaskEngine::new(Arc::new(ctx));

        engine
            .run("nested", |_| async { Err::<(), _>("bad") })
            .await;

        assert_eq!(exit_code.load(Ordering::SeqCst), 1);
        assert!(matches!(reporter.events().last(), Some(RecordedEvent::Error(..))));
    }

    #[tokio::test]
    async fn test_stop_on_failure_is_captured_at_creation() {
        let exit_code = Arc::new(AtomicI32::new(-1));
        let captured = exit_code.clone();
        let ctx = RuntimeContext::default()
            .with_exit_handler(move |code| captured.store(code, Ordering::SeqCst));
        let engine = TaskEngine::new(Arc::new(ctx));

        let task = engine.begin("before toggle", TaskOptions::default());
        engine.context().set_stop_on_failure(true);
        task.complete(Err("bad".into()));

        assert_eq!(exit_code.load(Ordering::SeqCst), -1);
    }

    #[tokio::test]
    async fn test_dropped_task_is_settled() {
        let (engine, reporter) = engine();
        drop(engine.begin("abandoned", TaskOptions::kind(TaskKind::Exec)));

        assert_eq!(engine.context().running_count(), 0);
        assert_eq!(engine.context().history()[0].status, TaskStatus::Fail);
        assert_eq!(reporter.events_for("abandoned").len(), 2);
    }

    #[tokio::test]
    async fn test_exit_code_aggregates_failures() {
        let (engine, _) = engine();
        engine.run("ok", |_| async { Ok::<_, String>(()) }).await;
        assert_eq!(engine.context().exit_code(), 0);

        engine.run("bad", |_| async { Err::<(), _>("x") }).await;
        assert_eq!(engine.context().exit_code(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_tasks_get_live_prefixes() {
        let (engine, reporter) = engine();
        let (tx_a, rx_a) = tokio::sync::oneshot::channel::<()>();
        let (tx_b, rx_b) = tokio::sync::oneshot::channel::<()>();

        let a = async {
            let result = engine
                .run("a", |_| async move { rx_a.await.map_err(|e| e.to_string()) })
                .await;
            let _ = tx_b.send(());
            result
        };
        let b = engine.run("b", |scope| async move {
            let _ = tx_a.send(());
            rx_b.await.map_err(|e| e.to_string())?;
            scope.output("after a finished");
            Ok::<_, String>(())
        });

        let (ra, rb) = tokio::join!(a, b);
        assert!(ra.has_succeeded() && rb.has_succeeded());

        let b_events = reporter.events_for("b");
        assert!(matches!(&b_events[0], RecordedEvent::Start(e) if e.prefix == "❰2❱"));
        // a has finished by now, so b is alone again
        assert!(matches!(&b_events[1], RecordedEvent::Output(e, _, _) if e.prefix.is_empty()));
    }
}
