//! Process-wide task state

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::reporter::{NullReporter, Reporter};
use crate::result::{TaskResult, TaskStatus};
use crate::task::{TaskId, TaskInfo, TaskKind};
use crate::tracker::RunningTasks;

type ExitHandler = Arc<dyn Fn(i32) + Send + Sync>;

/// Toggles that shape how tasks behave
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Terminate the process right after the first failed task
    pub stop_on_failure: bool,
    /// Never turn task failures into a non-zero exit code
    pub ignore_failures: bool,
    /// Suppress all task notifications
    pub silent: bool,
    /// Running under a test harness; failures do not change the exit code
    pub test_mode: bool,
}

/// Counts over the task history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub warnings: usize,
}

/// Shared state for one bunosh invocation.
///
/// Owns the id counter, the history log, the live task set and the
/// global toggles. Constructed once at startup and shared via `Arc`.
/// Toggles are read when a task is created, so flipping one only affects
/// tasks started afterwards.
pub struct RuntimeContext {
    next_id: AtomicU64,
    history: Mutex<Vec<TaskInfo>>,
    running: Mutex<RunningTasks>,
    stop_on_failure: AtomicBool,
    ignore_failures: AtomicBool,
    silent: AtomicBool,
    test_mode: AtomicBool,
    reporter: RwLock<Arc<dyn Reporter>>,
    exit_handler: ExitHandler,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new(Arc::new(NullReporter))
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("options", &self.options())
            .field("summary", &self.summary())
            .finish()
    }
}

impl RuntimeContext {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            history: Mutex::new(Vec::new()),
            running: Mutex::new(RunningTasks::new()),
            stop_on_failure: AtomicBool::new(false),
            ignore_failures: AtomicBool::new(false),
            silent: AtomicBool::new(false),
            test_mode: AtomicBool::new(false),
            reporter: RwLock::new(reporter),
            exit_handler: Arc::new(|code| std::process::exit(code)),
        }
    }

    pub fn with_options(self, options: RuntimeOptions) -> Self {
        self.apply_options(options);
        self
    }

    /// Replace the process termination used by stop-on-failure
    pub fn with_exit_handler(mut self, handler: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit_handler = Arc::new(handler);
        self
    }

    pub fn apply_options(&self, options: RuntimeOptions) {
        self.set_stop_on_failure(options.stop_on_failure);
        self.set_ignore_failures(options.ignore_failures);
        self.set_silent(options.silent);
        self.set_test_mode(options.test_mode);
    }

    pub fn options(&self) -> RuntimeOptions {
        RuntimeOptions {
            stop_on_failure: self.stop_on_failure(),
            ignore_failures: self.ignore_failures(),
            silent: self.silent(),
            test_mode: self.test_mode(),
        }
    }

    pub fn set_stop_on_failure(&self, value: bool) {
        self.stop_on_failure.store(value, Ordering::SeqCst);
    }

    pub fn stop_on_failure(&self) -> bool {
        self.stop_on_failure.load(Ordering::SeqCst)
    }

    pub fn set_ignore_failures(&self, value: bool) {
        self.ignore_failures.store(value, Ordering::SeqCst);
    }

    pub fn ignore_failures(&self) -> bool {
        self.ignore_failures.load(Ordering::SeqCst)
    }

    pub fn set_silent(&self, value: bool) {
        self.silent.store(value, Ordering::SeqCst);
    }

    pub fn silent(&self) -> bool {
        self.silent.load(Ordering::SeqCst)
    }

    pub fn set_test_mode(&self, value: bool) {
        self.test_mode.store(value, Ordering::SeqCst);
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode.load(Ordering::SeqCst)
    }

    pub fn reporter(&self) -> Arc<dyn Reporter> {
        self.reporter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_reporter(&self, reporter: Arc<dyn Reporter>) {
        *self.reporter.write().unwrap_or_else(PoisonError::into_inner) = reporter;
    }

    /// Copy of the full task history in creation order
    pub fn history(&self) -> Vec<TaskInfo> {
        self.history_guard().clone()
    }

    pub fn running_count(&self) -> usize {
        self.running_guard().len()
    }

    /// Current display prefix of a live task
    pub fn prefix_for(&self, id: TaskId) -> String {
        self.running_guard().prefix_for(id)
    }

    pub fn summary(&self) -> RunSummary {
        let history = self.history_guard();
        let mut summary = RunSummary {
            total: history.len(),
            ..RunSummary::default()
        };
        for info in history.iter() {
            match info.status {
                TaskStatus::Running => summary.running += 1,
                TaskStatus::Success => summary.succeeded += 1,
                TaskStatus::Fail => summary.failed += 1,
                TaskStatus::Warning => summary.warnings += 1,
            }
        }
        summary
    }

    /// Exit status for the end of the run
    pub fn exit_code(&self) -> i32 {
        if self.ignore_failures() || self.test_mode() {
            return 0;
        }
        if self.summary().failed > 0 {
            1
        } else {
            0
        }
    }

    /// Terminate through the configured exit handler
    pub fn exit(&self, code: i32) {
        debug!("Terminating with exit code {}", code);
        (self.exit_handler)(code);
    }

    /// Allocate an id, log the task and mark it live; returns the start prefix
    pub(crate) fn register(&self, name: String, kind: TaskKind) -> (TaskId, String) {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.history_guard()
            .push(TaskInfo::started(id, name, kind));
        let mut running = self.running_guard();
        running.insert(id);
        (id, running.prefix_for(id))
    }

    pub(crate) fn record_completion(
        &self,
        id: TaskId,
        status: TaskStatus,
        duration: Duration,
        result: TaskResult,
    ) {
        let mut history = self.history_guard();
        if let Some(info) = history.iter_mut().find(|info| info.id == id) {
            if info.status.is_terminal() {
                return;
            }
            info.status = status;
            info.duration = Some(duration);
            info.result = Some(result);
        }
    }

    pub(crate) fn remove_running(&self, id: TaskId) {
        self.running_guard().remove(id);
    }

    fn history_guard(&self) -> MutexGuard<'_, Vec<TaskInfo>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn running_guard(&self) -> MutexGuard<'_, RunningTasks> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_allocates_monotonic_ids() {
        let ctx = RuntimeContext::default();
        let (first, first_prefix) = ctx.register("a".into(), TaskKind::Task);
        let (second, second_prefix) = ctx.register("b".into(), TaskKind::Task);

        assert!(first < second);
        assert_eq!(first_prefix, "");
        assert_eq!(second_prefix, "❰2❱");
        assert_eq!(ctx.running_count(), 2);
        assert_eq!(ctx.history().len(), 2);
    }

    #[test]
    fn test_completion_is_recorded_once() {
        let ctx = RuntimeContext::default();
        let (id, _) = ctx.register("a".into(), TaskKind::Exec);
        ctx.record_completion(id, TaskStatus::Fail, Duration::from_millis(5), TaskResult::fail("x"));
        ctx.record_completion(id, TaskStatus::Success, Duration::from_millis(9), TaskResult::success("y"));
        ctx.remove_running(id);

        let history = ctx.history();
        assert_eq!(history[0].status, TaskStatus::Fail);
        assert_eq!(history[0].duration, Some(Duration::from_millis(5)));
        assert_eq!(ctx.running_count(), 0);
    }

    #[test]
    fn test_exit_code_respects_modes() {
        let ctx = RuntimeContext::default();
        let (id, _) = ctx.register("a".into(), TaskKind::Task);
        ctx.record_completion(id, TaskStatus::Fail, Duration::ZERO, TaskResult::fail("x"));
        assert_eq!(ctx.exit_code(), 1);

        ctx.set_ignore_failures(true);
        assert_eq!(ctx.exit_code(), 0);

        ctx.set_ignore_failures(false);
        ctx.set_test_mode(true);
        assert_eq!(ctx.exit_code(), 0);
    }

    #[test]
    fn test_warnings_do_not_fail_the_run() {
        let ctx = RuntimeContext::default();
        let (id, _) = ctx.register("a".into(), TaskKind::Task);
        ctx.record_completion(id, TaskStatus::Warning, Duration::ZERO, TaskResult::warning("x"));
        assert_eq!(ctx.exit_code(), 0);
        assert_eq!(ctx.summary().warnings, 1);
    }

    #[test]
    fn test_options_round_trip() {
        let options = RuntimeOptions {
            stop_on_failure: true,
            ignore_failures: false,
            silent: true,
            test_mode: false,
        };
        let ctx = RuntimeContext::default().with_options(options);
        assert_eq!(ctx.options(), options);
    }
}
