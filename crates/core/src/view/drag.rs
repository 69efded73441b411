//! Drag-gesture translation
//!
//! A drag gives source/destination slots in the *currently filtered*
//! view; the store orders the *full* list. This module translates the
//! gesture into a full-list move without disturbing the relative order
//! of tasks the filter is hiding.

use super::filter::TaskFilter;
use crate::task::Task;

/// A completed drag, in filtered-view coordinates.
///
/// `destination` is `None` when the task was dropped outside any valid
/// target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragGesture {
    pub source: usize,
    pub destination: Option<usize>,
}

impl DragGesture {
    pub fn new(source: usize, destination: usize) -> Self {
        Self {
            source,
            destination: Some(destination),
        }
    }

    /// A drop outside any valid target
    pub fn cancelled(source: usize) -> Self {
        Self {
            source,
            destination: None,
        }
    }
}

/// Compute the full list after applying `gesture`, with every position
/// recomputed as its array index.
///
/// Returns `None` when the gesture is a no-op: no destination, an
/// unchanged slot, or out-of-range indices. Otherwise the moved task
/// lands immediately before the task occupying the destination slot of
/// the post-removal filtered view (after the last visible task when
/// dropped at the end), and hidden tasks keep their relative order.
pub fn plan_move(tasks: &[Task], filter: TaskFilter, gesture: &DragGesture) -> Option<Vec<Task>> {
    let destination = gesture.destination?;
    if destination == gesture.source {
        return None;
    }

    // Full-list indices of the tasks the filter shows, in store order
    let visible: Vec<usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| filter.matches(t))
        .map(|(index, _)| index)
        .collect();
    if gesture.source >= visible.len() || destination >= visible.len() {
        return None;
    }

    let from = visible[gesture.source];
    let mut reordered = tasks.to_vec();
    let moved = reordered.remove(from);

    // Visible slots after the removal, still as full-list indices
    let remaining: Vec<usize> = visible
        .iter()
        .filter(|&&index| index != from)
        .map(|&index| if index > from { index - 1 } else { index })
        .collect();
    let insert_at = match remaining.get(destination) {
        Some(&index) => index,
        None => remaining.last().map_or(reordered.len(), |&index| index + 1),
    };
    reordered.insert(insert_at, moved);

    for (index, task) in reordered.iter_mut().enumerate() {
        task.position = index as i64;
    }
    Some(reordered)
}
