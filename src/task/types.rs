//! Client view model for board tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{KanbanError, Result};

/// Maximum title length accepted by the store.
pub const TITLE_MAX_CHARS: usize = 200;

/// Maximum description length accepted by the store.
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// Prefix of client-generated ids for tasks not yet stored.
const PROVISIONAL_PREFIX: &str = "pending-";

/// Workflow status; each status is exactly one board column.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// All statuses in column order.
    pub const ALL: [TaskStatus; 3] = [Self::Todo, Self::InProgress, Self::Done];

    /// Column key used by the view (`todo`, `inprogress`, `done`).
    pub fn key(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "inprogress",
            Self::Done => "done",
        }
    }

    /// Human-readable column title.
    pub fn title(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Position of this status' column on the board.
    pub fn column_index(self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Done => 2,
        }
    }

    /// Parse a column key or status name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "todo" => Some(Self::Todo),
            "inprogress" | "in_progress" | "in-progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Task priority; drives the in-column sort and the card badge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    /// Sort weight: higher sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Badge shown on task cards.
    pub fn badge(self) -> &'static str {
        match self {
            Self::High => "🔴",
            Self::Medium => "🟡",
            Self::Low => "🟢",
        }
    }

    /// Parse a priority name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
        }
    }
}

/// Client-side task identifier.
///
/// Stored tasks carry their numeric store id rendered as a string; tasks
/// inserted optimistically carry a provisional `pending-<uuid>` id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wrap an id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a provisional id for a task not yet stored.
    pub fn provisional() -> Self {
        Self(format!("{PROVISIONAL_PREFIX}{}", uuid::Uuid::new_v4().simple()))
    }

    /// Returns `true` for ids generated by [`TaskId::provisional`].
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_PREFIX)
    }

    /// The numeric store id, if this id refers to a stored task.
    pub fn numeric(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    /// Borrow the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A task as held by the board view model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub has_notification: bool,
    pub tags: Vec<String>,
}

impl Task {
    /// Build a provisional task from a draft, stamped with `now`.
    pub fn provisional(draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::provisional(),
            title: draft.title,
            description: draft.description,
            status: draft.status,
            priority: draft.priority,
            created_at: now,
            updated_at: now,
            due_date: draft.due_date,
            has_notification: draft.has_notification,
            tags: draft.tags,
        }
    }

    /// Overwrite the editable fields with a draft; `id` and `created_at`
    /// are kept.
    pub fn apply_draft(&mut self, draft: TaskDraft, now: DateTime<Utc>) {
        self.title = draft.title;
        self.description = draft.description;
        self.status = draft.status;
        self.priority = draft.priority;
        self.due_date = draft.due_date;
        self.has_notification = draft.has_notification;
        self.tags = draft.tags;
        self.updated_at = now;
    }

    /// The editable fields of this task as a draft.
    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            has_notification: self.has_notification,
            tags: self.tags.clone(),
        }
    }

    /// Returns `true` when the task should produce a reminder: it has a due
    /// date, notifications are enabled and it is not completed.
    pub fn wants_reminder(&self) -> bool {
        self.due_date.is_some() && self.has_notification && self.status != TaskStatus::Done
    }
}

/// Editable task fields, as submitted by the task form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub has_notification: bool,
    pub tags: Vec<String>,
}

impl TaskDraft {
    /// Create a draft with the given title and defaults elsewhere.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set a due date and enable its reminder.
    pub fn with_reminder(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self.has_notification = true;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Reject drafts the store would refuse, before any network call.
    ///
    /// Trims the title and drops blank descriptions in place.
    pub fn validate(&mut self) -> Result<()> {
        self.title = self.title.trim().to_owned();
        if self.title.is_empty() {
            return Err(KanbanError::Validation("title is required".to_owned()));
        }
        if self.title.chars().count() > TITLE_MAX_CHARS {
            return Err(KanbanError::Validation(format!(
                "title exceeds {TITLE_MAX_CHARS} characters"
            )));
        }
        if self
            .description
            .as_deref()
            .is_some_and(|d| d.trim().is_empty())
        {
            self.description = None;
        }
        if let Some(description) = &self.description
            && description.chars().count() > DESCRIPTION_MAX_CHARS
        {
            return Err(KanbanError::Validation(format!(
                "description exceeds {DESCRIPTION_MAX_CHARS} characters"
            )));
        }
        Ok(())
    }
}
