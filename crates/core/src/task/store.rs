//! Ordered in-memory task store
//!
//! The single source of truth for the current view. The backend owns the
//! durable copy; this store holds whatever the last successful fetch (or
//! optimistic reorder) produced, always sorted ascending by `position`.
//! The sort is stable, so tasks with transiently equal positions keep
//! their insertion order instead of flickering.

use super::model::Task;

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list, re-sorting by position.
    ///
    /// Racing refreshes are resolved here as last-writer-wins: whatever
    /// load completes last is current truth.
    pub fn load(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.sort();
    }

    /// Replace the task with the same id, or append it when unknown
    pub fn upsert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => self.tasks.push(task),
        }
        self.sort();
    }

    /// Remove a task by id, returning it if present
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(index))
    }

    /// Look up a task by id
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Read-only view of the ordered list
    pub fn snapshot(&self) -> &[Task] {
        &self.tasks
    }

    /// The ordered id sequence, as sent in reorder calls
    pub fn ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }

    /// Append-to-end position for a new task: one past the current
    /// maximum, or 0 for an empty list.
    pub fn next_position(&self) -> i64 {
        self.tasks
            .iter()
            .map(|t| t.position)
            .max()
            .map_or(0, |max| max + 1)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn sort(&mut self) {
        self.tasks.sort_by_key(|t| t.position);
    }
}
