//! Completion filter applied for rendering

use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Which tasks to show.
///
/// Applied only when rendering; store order and positions are never
/// affected by the active filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskFilter {
    #[default]
    All,
    Done,
    NotDone,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Done => task.done,
            Self::NotDone => !task.done,
        }
    }

    /// Project the visible tasks, preserving store order
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }
}
