//! Board state controller.
//!
//! Mutations are optimistic: the local columns change first, then the task
//! API is called. Success is followed by a full reload so the board equals
//! the store; failure restores the pre-mutation snapshot, reloads, and
//! returns the error.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::column::{BoardColumns, Column};
use super::filter::{TaskFilter, available_tags};
use crate::client::TaskApi;
use crate::error::{KanbanError, Result};
use crate::reminder::{Reminder, ReminderScheduler};
use crate::task::{Mapper, Task, TaskDraft, TaskId, TaskStatus};

#[derive(Debug, Clone, PartialEq)]
enum MutationKind {
    Create,
    Update { id: i64 },
}

/// A locally applied mutation awaiting [`BoardController::commit`].
#[derive(Debug, Clone)]
#[must_use = "a pending mutation is only persisted by BoardController::commit"]
pub struct PendingMutation {
    kind: MutationKind,
    task: Task,
    snapshot: BoardColumns,
}

impl PendingMutation {
    /// The task as shown on the board while the mutation is in flight.
    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn is_create(&self) -> bool {
        self.kind == MutationKind::Create
    }
}

/// Three-column board backed by a [`TaskApi`].
pub struct BoardController<A: TaskApi> {
    api: A,
    mapper: Mapper,
    columns: BoardColumns,
    scheduler: ReminderScheduler,
    pending_delete: Option<TaskId>,
    filter: TaskFilter,
}

impl<A: TaskApi> BoardController<A> {
    pub fn new(api: A, mapper: Mapper, scheduler: ReminderScheduler) -> Self {
        Self {
            api,
            mapper,
            columns: BoardColumns::default(),
            scheduler,
            pending_delete: None,
            filter: TaskFilter::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Request notification permission if undecided, then load the board.
    pub async fn mount(&mut self) -> Result<()> {
        self.scheduler.request_permission_if_undecided();
        self.load().await
    }

    /// Fetch every task, rebuild the columns and reschedule reminders.
    pub async fn load(&mut self) -> Result<()> {
        let records = self.api.list_tasks().await?;
        let tasks: Vec<Task> = records
            .iter()
            .map(|record| self.mapper.task_from_wire(record))
            .collect();
        self.columns = BoardColumns::from_tasks(tasks);
        let tasks = self.columns.all_tasks();
        self.scheduler.setup_notifications(&tasks);
        debug!(tasks = self.columns.len(), "board loaded");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Add / edit
    // -----------------------------------------------------------------------

    /// Validate `draft` and show it on the board under a provisional id.
    pub fn begin_add(&mut self, mut draft: TaskDraft) -> Result<PendingMutation> {
        draft.validate()?;
        let snapshot = self.columns.clone();
        let task = Task::provisional(draft, Utc::now());
        self.columns.insert(task.clone());
        Ok(PendingMutation {
            kind: MutationKind::Create,
            task,
            snapshot,
        })
    }

    /// Validate `draft` and apply it to task `id` locally.
    ///
    /// The task's reminder state is reset.
    pub fn begin_edit(&mut self, id: &TaskId, mut draft: TaskDraft) -> Result<PendingMutation> {
        draft.validate()?;
        let current = self
            .columns
            .find(id)
            .ok_or_else(|| KanbanError::NotFound(id.to_string()))?;
        let numeric = id
            .numeric()
            .ok_or_else(|| KanbanError::NotFound(id.to_string()))?;

        let mut task = current.clone();
        task.apply_draft(draft, Utc::now());
        let snapshot = self.columns.clone();
        self.columns.replace(task.clone());
        self.scheduler.reset_task(id);
        Ok(PendingMutation {
            kind: MutationKind::Update { id: numeric },
            task,
            snapshot,
        })
    }

    /// Persist a pending mutation and reconcile with the store.
    pub async fn commit(&mut self, pending: PendingMutation) -> Result<()> {
        let draft = pending.task.to_draft();
        let outcome = match pending.kind {
            MutationKind::Create => {
                let payload = self.mapper.payload_from_draft(&draft, None);
                self.api.create_task(&payload).await.map(|created| {
                    info!(task_id = created.id, "task added");
                })
            }
            MutationKind::Update { id } => {
                let payload = self.mapper.payload_from_draft(&draft, Some(id));
                self.api.update_task(id, &payload).await.map(|()| {
                    info!(task_id = id, "task updated");
                })
            }
        };

        match outcome {
            Ok(()) => self.load().await,
            Err(e) => {
                warn!(task_id = %pending.task.id, "mutation failed, restoring board: {e}");
                self.columns = pending.snapshot;
                self.reload_after_failure().await;
                Err(e)
            }
        }
    }

    pub async fn add_task(&mut self, draft: TaskDraft) -> Result<()> {
        let pending = self.begin_add(draft)?;
        self.commit(pending).await
    }

    pub async fn edit_task(&mut self, id: &TaskId, draft: TaskDraft) -> Result<()> {
        let pending = self.begin_edit(id, draft)?;
        self.commit(pending).await
    }

    /// Relocate a task to another column. Same column is a no-op.
    pub async fn move_task(&mut self, id: &TaskId, target: TaskStatus) -> Result<()> {
        let task = self
            .columns
            .find(id)
            .ok_or_else(|| KanbanError::NotFound(id.to_string()))?;
        if task.status == target {
            return Ok(());
        }
        let draft = task.to_draft().with_status(target);
        debug!(task_id = %id, from = %task.status, to = %target, "moving task");
        self.edit_task(id, draft).await
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Mark `id` for deletion pending confirmation.
    pub fn request_delete(&mut self, id: &TaskId) -> Result<()> {
        if self.columns.find(id).is_none() {
            return Err(KanbanError::NotFound(id.to_string()));
        }
        self.pending_delete = Some(id.clone());
        Ok(())
    }

    pub fn pending_delete(&self) -> Option<&TaskId> {
        self.pending_delete.as_ref()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the task marked by [`request_delete`](Self::request_delete).
    ///
    /// A task already gone from the store only triggers a reload.
    pub async fn confirm_delete(&mut self) -> Result<()> {
        let Some(id) = self.pending_delete.take() else {
            return Ok(());
        };
        let snapshot = self.columns.clone();
        self.columns.remove(&id);
        self.scheduler.reset_task(&id);

        let Some(numeric) = id.numeric() else {
            return self.load().await;
        };

        match self.api.delete_task(numeric).await {
            Ok(()) => {
                info!(task_id = numeric, "task deleted");
                self.load().await
            }
            Err(KanbanError::NotFound(_)) => {
                debug!(task_id = numeric, "task already deleted");
                self.load().await
            }
            Err(e) => {
                warn!(task_id = numeric, "delete failed, restoring board: {e}");
                self.columns = snapshot;
                self.reload_after_failure().await;
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn column(&self, status: TaskStatus) -> &Column {
        self.columns.column(status)
    }

    pub fn columns(&self) -> &BoardColumns {
        &self.columns
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.columns.find(id)
    }

    pub fn all_tasks(&self) -> Vec<Task> {
        self.columns.all_tasks()
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    /// Tasks of one column that pass the current filter, in display order.
    pub fn filtered(&self, status: TaskStatus) -> Vec<&Task> {
        self.columns
            .column(status)
            .tasks()
            .iter()
            .filter(|task| self.filter.matches(task))
            .collect()
    }

    pub fn available_tags(&self) -> Vec<String> {
        available_tags(self.columns.iter())
    }

    // -----------------------------------------------------------------------
    // Reminders
    // -----------------------------------------------------------------------

    /// Wait for the next reminder timer; `None` when nothing is armed.
    pub async fn next_reminder(&mut self) -> Option<Reminder> {
        self.scheduler.next_fired().await
    }

    /// Deliver reminders whose timers already fired.
    pub fn dispatch_reminders(&mut self) -> Vec<Reminder> {
        self.scheduler.dispatch_ready()
    }

    /// Cancel every reminder timer and drop pending UI state.
    pub fn teardown(&mut self) {
        self.scheduler.clear_all_timeouts();
        self.pending_delete = None;
        debug!("board torn down");
    }

    async fn reload_after_failure(&mut self) {
        if let Err(e) = self.load().await {
            warn!("reload after failed mutation also failed: {e}");
        }
    }
}
