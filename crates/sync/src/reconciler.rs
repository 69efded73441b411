//! Reconciler: local mutations confirmed against backend truth
//!
//! Mutations follow a two-phase apply: a tentative local step, then a
//! confirm-or-compensate step once the backend answers. Only the
//! drag-reorder path mutates the store before the call resolves; every
//! other operation waits for confirmation and then refreshes from the
//! authoritative list, so a failure can never leave it half-applied.

use std::sync::Arc;

use tracing::{debug, info, warn};

use td_core::task::{Task, TaskDraft, TaskStore};
use td_core::view::{plan_move, DragGesture, TaskFilter};

use crate::client::TaskBackend;
use crate::error::{ReconcileError, SyncError};
use crate::session::Session;

/// How a mutation settled
#[derive(Debug)]
pub enum Outcome {
    /// The backend confirmed and the store reflects authoritative truth
    Confirmed,

    /// The optimistic mutation was rolled back by refetching the
    /// authoritative list; the error is still worth surfacing
    Compensated { error: SyncError },

    /// The session ended while the call was in flight; the result was
    /// dropped and the store left alone
    Discarded,

    /// Nothing to do, e.g. a drag without a valid destination
    Noop,
}

/// Mediates between the in-memory [`TaskStore`] and the backend, owning
/// the rollback/refresh policy.
pub struct Reconciler {
    store: TaskStore,
    backend: Arc<dyn TaskBackend>,
    session: Session,
}

impl Reconciler {
    pub fn new(backend: Arc<dyn TaskBackend>, session: Session) -> Self {
        Self {
            store: TaskStore::new(),
            backend,
            session,
        }
    }

    /// Read-only view of the current ordered task list
    pub fn tasks(&self) -> &[Task] {
        self.store.snapshot()
    }

    /// Tasks visible under `filter`, in store order
    pub fn visible(&self, filter: TaskFilter) -> Vec<&Task> {
        filter.apply(self.store.snapshot())
    }

    /// Replace the store from the authoritative backend list.
    ///
    /// Refreshes triggered by different actions may race; the store
    /// simply accepts the most recently completed load as current truth.
    pub async fn refresh(&mut self) -> Result<Outcome, ReconcileError> {
        let epoch = self.session.epoch().await;
        let tasks = self.backend.list_tasks().await?;
        if !self.still_current(epoch).await {
            return Ok(Outcome::Discarded);
        }
        self.store.load(tasks);
        Ok(Outcome::Confirmed)
    }

    /// Create a task with append-to-end semantics.
    ///
    /// Nothing is applied locally until the backend confirms, since the
    /// id is server-assigned; the store is then refreshed wholesale.
    pub async fn create(&mut self, draft: TaskDraft) -> Result<Outcome, ReconcileError> {
        if let Err(e) = draft.validate() {
            return Err(SyncError::Validation(e.to_string()).into());
        }
        let draft = draft.at_position(self.store.next_position());

        let epoch = self.session.epoch().await;
        let created = self.backend.create_task(&draft).await?;
        if !self.still_current(epoch).await {
            return Ok(Outcome::Discarded);
        }
        info!("Created task {} at position {}", created.id, created.position);
        self.refresh().await
    }

    /// Send a full updated payload; the store is untouched until the
    /// backend confirms.
    pub async fn update(&mut self, task: Task) -> Result<Outcome, ReconcileError> {
        if let Err(e) = task.validate() {
            return Err(SyncError::Validation(e.to_string()).into());
        }

        let epoch = self.session.epoch().await;
        let updated = self.backend.update_task(&task).await?;
        if !self.still_current(epoch).await {
            return Ok(Outcome::Discarded);
        }
        debug!("Updated task {}", updated.id);
        self.refresh().await
    }

    /// Toggle completion for `id`, preserving its position
    pub async fn toggle_done(&mut self, id: &str) -> Result<Outcome, ReconcileError> {
        let task = match self.store.get(id) {
            Some(task) => task.clone(),
            None => return Err(SyncError::Validation(format!("Task {} not found", id)).into()),
        };
        let done = !task.done;
        self.update(task.with_done(done)).await
    }

    /// Delete a task, then recompact the remaining positions to a dense
    /// `0..N-1` sequence and push the new order to the backend.
    ///
    /// A reorder failure after a successful delete surfaces as
    /// [`ReconcileError::CompactionFailed`]: the task is gone locally
    /// (the backend already dropped it), but positions stay stale until
    /// the next refresh.
    pub async fn delete(&mut self, id: &str) -> Result<Outcome, ReconcileError> {
        let epoch = self.session.epoch().await;
        self.backend.delete_task(id).await?;
        if !self.still_current(epoch).await {
            return Ok(Outcome::Discarded);
        }

        // The backend no longer has the task; the store must not imply
        // it still exists, whatever happens to the compaction below.
        self.store.remove(id);
        let ids = self.store.ids();
        if !ids.is_empty() {
            if let Err(error) = self.backend.reorder_tasks(&ids).await {
                warn!("Compaction after deleting {} failed: {}", id, error);
                return Err(ReconcileError::CompactionFailed(error));
            }
        }
        if !self.still_current(epoch).await {
            return Ok(Outcome::Discarded);
        }
        info!("Deleted task {}", id);
        self.refresh().await
    }

    /// Apply a drag gesture optimistically: splice locally, recompute
    /// every position as its array index, render, then push the full id
    /// order in a single reorder call.
    ///
    /// On failure the store is reverted by refetching the authoritative
    /// list, never by undoing the splice, so it converges even when
    /// the optimistic state had already diverged from a racing mutation.
    pub async fn drag_reorder(
        &mut self,
        gesture: DragGesture,
        filter: TaskFilter,
    ) -> Result<Outcome, ReconcileError> {
        let Some(reordered) = plan_move(self.store.snapshot(), filter, &gesture) else {
            return Ok(Outcome::Noop);
        };
        self.store.load(reordered);
        let ids = self.store.ids();

        let epoch = self.session.epoch().await;
        match self.backend.reorder_tasks(&ids).await {
            Ok(()) => {
                if !self.still_current(epoch).await {
                    return Ok(Outcome::Discarded);
                }
                debug!("Reordered {} tasks", ids.len());
                Ok(Outcome::Confirmed)
            }
            Err(reorder) => {
                if !self.still_current(epoch).await {
                    return Ok(Outcome::Discarded);
                }
                warn!("Reorder failed, reverting from backend: {}", reorder);
                match self.backend.list_tasks().await {
                    Ok(tasks) => {
                        if !self.still_current(epoch).await {
                            return Ok(Outcome::Discarded);
                        }
                        self.store.load(tasks);
                        Ok(Outcome::Compensated { error: reorder })
                    }
                    Err(refresh) => Err(ReconcileError::RevertFailed { reorder, refresh }),
                }
            }
        }
    }

    /// In-flight results are discarded when the session has ended (or
    /// been replaced) since the call went out.
    async fn still_current(&self, epoch: u64) -> bool {
        self.session.epoch().await == epoch && self.session.is_authenticated().await
    }
}
