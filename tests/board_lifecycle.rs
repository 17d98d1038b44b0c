//! Board controller lifecycle: optimistic mutations, rollback and reminders.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use kanban::board::BoardController;
use kanban::reminder::{
    ChannelNotifier, Notice, NotificationPermission, ReminderScheduler, ReminderState,
};
use kanban::task::{ApiTask, ClientZone, Mapper, TaskPayload};
use kanban::{
    KanbanError, LocalTaskApi, Result, SqliteTaskStore, TaskApi, TaskDraft, TaskId, TaskStatus,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedReceiver;

/// Local API whose writes can be made to fail on demand.
struct FlakyApi {
    inner: LocalTaskApi,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FlakyApi {
    fn new(store: Arc<SqliteTaskStore>) -> Self {
        Self {
            inner: LocalTaskApi::new(store),
            fail_updates: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TaskApi for FlakyApi {
    async fn list_tasks(&self) -> Result<Vec<ApiTask>> {
        self.inner.list_tasks().await
    }

    async fn create_task(&self, payload: &TaskPayload) -> Result<ApiTask> {
        self.inner.create_task(payload).await
    }

    async fn update_task(&self, id: i64, payload: &TaskPayload) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(KanbanError::Transport("connection reset".to_owned()));
        }
        self.inner.update_task(id, payload).await
    }

    async fn delete_task(&self, id: i64) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(KanbanError::Transport("connection reset".to_owned()));
        }
        self.inner.delete_task(id).await
    }
}

struct Fixture {
    store: Arc<SqliteTaskStore>,
    api: Arc<FlakyApi>,
    board: BoardController<Arc<FlakyApi>>,
    notices: UnboundedReceiver<Notice>,
}

fn fixture() -> Fixture {
    let store = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
    let api = Arc::new(FlakyApi::new(Arc::clone(&store)));
    let (notifier, notices) = ChannelNotifier::new(NotificationPermission::Default);
    let board = BoardController::new(
        Arc::clone(&api),
        Mapper::new(ClientZone::utc()),
        ReminderScheduler::new(Arc::new(notifier)),
    );
    Fixture {
        store,
        api,
        board,
        notices,
    }
}

async fn seed(f: &mut Fixture, draft: TaskDraft) -> TaskId {
    f.board.add_task(draft).await.unwrap();
    let tasks = f.board.all_tasks();
    tasks
        .iter()
        .max_by_key(|t| t.id.numeric())
        .map(|t| t.id.clone())
        .unwrap()
}

fn stored_title(f: &Fixture, id: &TaskId) -> String {
    f.store.get(id.numeric().unwrap()).unwrap().title
}

// ---------------------------------------------------------------------------
// Optimistic edits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edit_is_visible_before_commit_and_matches_store_after() {
    let mut f = fixture();
    f.board.mount().await.unwrap();
    let id = seed(&mut f, TaskDraft::new("Draft outline")).await;

    let draft = f
        .board
        .task(&id)
        .unwrap()
        .to_draft()
        .with_description("with sources");
    let draft = TaskDraft {
        title: "Final outline".to_owned(),
        ..draft
    };
    let pending = f.board.begin_edit(&id, draft).unwrap();
    assert!(!pending.is_create());
    assert_eq!(f.board.task(&id).unwrap().title, "Final outline");
    assert_eq!(stored_title(&f, &id), "Draft outline");

    f.board.commit(pending).await.unwrap();
    let shown = f.board.task(&id).unwrap().clone();
    let record = f.store.get(id.numeric().unwrap()).unwrap();
    let stored = Mapper::new(ClientZone::utc()).task_from_wire(&record);
    assert_eq!(shown, stored);
    assert_eq!(shown.description.as_deref(), Some("with sources"));
}

#[tokio::test]
async fn failed_update_restores_previous_state() {
    let mut f = fixture();
    let id = seed(&mut f, TaskDraft::new("Keep me")).await;
    f.api.fail_updates.store(true, Ordering::SeqCst);

    let draft = TaskDraft::new("Lost edit");
    let err = f.board.edit_task(&id, draft).await.unwrap_err();
    assert!(matches!(err, KanbanError::Transport(_)));
    assert!(err.requires_reload());
    assert_eq!(f.board.task(&id).unwrap().title, "Keep me");
    assert_eq!(stored_title(&f, &id), "Keep me");
}

#[tokio::test]
async fn failed_move_leaves_task_in_its_column() {
    let mut f = fixture();
    let id = seed(&mut f, TaskDraft::new("Stuck")).await;
    f.api.fail_updates.store(true, Ordering::SeqCst);

    assert!(f.board.move_task(&id, TaskStatus::Done).await.is_err());
    assert_eq!(f.board.column(TaskStatus::Todo).len(), 1);
    assert!(f.board.column(TaskStatus::Done).is_empty());
}

#[tokio::test]
async fn move_task_changes_column_and_store() {
    let mut f = fixture();
    let id = seed(&mut f, TaskDraft::new("Migrate db")).await;

    f.board.move_task(&id, TaskStatus::InProgress).await.unwrap();
    assert!(f.board.column(TaskStatus::Todo).is_empty());
    assert_eq!(f.board.column(TaskStatus::InProgress).tasks()[0].id, id);

    let record = f.store.get(id.numeric().unwrap()).unwrap();
    let task = Mapper::new(ClientZone::utc()).task_from_wire(&record);
    assert_eq!(task.status, TaskStatus::InProgress);
}

#[tokio::test]
async fn editing_a_task_deleted_elsewhere_drops_it() {
    let mut f = fixture();
    let id = seed(&mut f, TaskDraft::new("Ephemeral")).await;
    f.store.delete(id.numeric().unwrap()).unwrap();

    let err = f
        .board
        .edit_task(&id, TaskDraft::new("Too late"))
        .await
        .unwrap_err();
    assert!(matches!(err, KanbanError::NotFound(_)));
    assert!(f.board.task(&id).is_none());
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_delete_restores_the_task() {
    let mut f = fixture();
    let id = seed(&mut f, TaskDraft::new("Survivor")).await;
    f.api.fail_deletes.store(true, Ordering::SeqCst);

    f.board.request_delete(&id).unwrap();
    assert!(f.board.confirm_delete().await.is_err());
    assert!(f.board.task(&id).is_some());
    assert!(f.board.pending_delete().is_none());
}

#[tokio::test]
async fn deleting_an_already_deleted_task_just_reloads() {
    let mut f = fixture();
    let id = seed(&mut f, TaskDraft::new("Gone")).await;
    f.board.request_delete(&id).unwrap();
    f.store.delete(id.numeric().unwrap()).unwrap();

    f.board.confirm_delete().await.unwrap();
    assert!(f.board.task(&id).is_none());
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn task_due_soon_notifies_once_on_load() {
    let mut f = fixture();
    f.board.mount().await.unwrap();
    let due = Utc::now() + TimeDelta::minutes(10);
    let id = seed(&mut f, TaskDraft::new("Call dentist").with_reminder(due)).await;

    match f.notices.try_recv().unwrap() {
        Notice::Shown(reminder) => {
            assert_eq!(reminder.task_id, id);
            assert_eq!(reminder.message(), "Deadline in 15 minutes: Call dentist");
        }
        other => panic!("expected a shown reminder, got {other:?}"),
    }

    f.board.load().await.unwrap();
    assert!(f.notices.try_recv().is_err());
    assert_eq!(f.board.scheduler().state(&id), ReminderState::Notified);
}

#[tokio::test]
async fn editing_a_notified_task_allows_a_new_reminder() {
    let mut f = fixture();
    f.board.mount().await.unwrap();
    let due = Utc::now() + TimeDelta::minutes(5);
    let id = seed(&mut f, TaskDraft::new("Stand-up").with_reminder(due)).await;
    assert!(matches!(f.notices.try_recv(), Ok(Notice::Shown(_))));

    let draft = f
        .board
        .task(&id)
        .unwrap()
        .to_draft()
        .with_description("moved room");
    f.board.edit_task(&id, draft).await.unwrap();
    assert!(matches!(f.notices.try_recv(), Ok(Notice::Shown(_))));
}

#[tokio::test(start_paused = true)]
async fn later_task_fires_through_next_reminder() {
    let mut f = fixture();
    f.board.mount().await.unwrap();
    let due = Utc::now() + TimeDelta::minutes(40);
    let id = seed(&mut f, TaskDraft::new("Submit expenses").with_reminder(due)).await;
    assert_eq!(f.board.scheduler().state(&id), ReminderState::Armed);
    assert!(f.notices.try_recv().is_err());

    let reminder = f.board.next_reminder().await.unwrap();
    assert_eq!(reminder.task_id, id);
    assert!(matches!(f.notices.try_recv(), Ok(Notice::Shown(_))));
    assert!(f.board.next_reminder().await.is_none());
}

#[tokio::test]
async fn done_tasks_do_not_notify() {
    let mut f = fixture();
    f.board.mount().await.unwrap();
    let due = Utc::now() + TimeDelta::minutes(3);
    seed(
        &mut f,
        TaskDraft::new("Already shipped")
            .with_status(TaskStatus::Done)
            .with_reminder(due),
    )
    .await;
    assert!(f.notices.try_recv().is_err());
}

#[tokio::test]
async fn teardown_cancels_pending_timers() {
    let mut f = fixture();
    let due = Utc::now() + TimeDelta::hours(2);
    seed(&mut f, TaskDraft::new("Later").with_reminder(due)).await;
    assert_eq!(f.board.scheduler().armed_count(), 1);

    f.board.teardown();
    assert_eq!(f.board.scheduler().armed_count(), 0);
}
