//! Task model shared by the board, the task API and the store.
//!
//! Sub-modules:
//! - `types`: client view model (`Task`, `TaskDraft`, status/priority enums).
//! - `wire`: wire/storage representation exchanged over HTTP.
//! - `mapper`: pure translation between the two representations.

pub mod mapper;
pub mod types;
pub mod wire;

pub use mapper::{ClientZone, Mapper};
pub use types::{
    DESCRIPTION_MAX_CHARS, Priority, TITLE_MAX_CHARS, Task, TaskDraft, TaskId, TaskStatus,
};
pub use wire::{ApiTask, TaskPayload, WireEnum};
