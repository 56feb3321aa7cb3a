//! Live task set and ordinal prefixes

use crate::task::TaskId;

/// Insertion-ordered set of currently running tasks.
///
/// The ordinal shown for a task is its 1-based position among the tasks
/// that are live at the moment of the query. It is recomputed on every
/// call, so a task's number moves down when earlier tasks finish.
#[derive(Debug, Clone, Default)]
pub struct RunningTasks {
    ids: Vec<TaskId>,
}

impl RunningTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TaskId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    /// Remove a task; returns false if it was not live
    pub fn remove(&mut self, id: TaskId) -> bool {
        match self.ids.iter().position(|live| *live == id) {
            Some(index) => {
                self.ids.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[TaskId] {
        &self.ids
    }

    /// 1-based live position of a task
    pub fn ordinal(&self, id: TaskId) -> Option<usize> {
        self.ids.iter().position(|live| *live == id).map(|i| i + 1)
    }

    /// Display prefix: empty below two live tasks, otherwise `❰n❱`
    pub fn prefix_for(&self, id: TaskId) -> String {
        if self.ids.len() < 2 {
            return String::new();
        }
        match self.ordinal(id) {
            Some(n) => format!("❰{}❱", n),
            None => String::new(),
        }
    }
}
