//! Kanban: a single-board task tracker.
//!
//! The crate provides a REST task store and a board client:
//! Board controller → Task API → Task store (SQLite)
//!
//! # Architecture
//!
//! - **Task model**: view model, wire representation and the mapper between them
//! - **Store**: SQLite persistence, the single arbiter of task state
//! - **Server**: axum routes under `/api/tasks`
//! - **Client**: the `TaskApi` trait over HTTP (reqwest) or an in-process store
//! - **Board**: three status columns with optimistic mutations
//! - **Reminders**: per-task one-shot notifications before a due date
//! - **Theme**: persisted light/dark preference

pub mod board;
pub mod client;
pub mod config;
pub mod error;
pub mod paths;
pub mod reminder;
pub mod server;
pub mod store;
pub mod task;
pub mod theme;

pub use board::{BoardController, TaskFilter};
pub use client::{HttpTaskApi, LocalTaskApi, TaskApi};
pub use config::KanbanConfig;
pub use error::{KanbanError, Result};
pub use reminder::{Reminder, ReminderScheduler};
pub use server::TaskServer;
pub use store::SqliteTaskStore;
pub use task::{Priority, Task, TaskDraft, TaskId, TaskStatus};
pub use theme::{PreferenceStore, Theme};
