//! Durable task store.
//!
//! Sub-modules:
//! - `schema`: SQLite DDL definitions.
//! - `sqlite`: `SqliteTaskStore`, the single arbiter of task state.

pub(crate) mod schema;
pub mod sqlite;

pub use sqlite::{SqliteTaskStore, StoreError};

/// Current schema version stamped into `schema_meta`.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Database filename within the data directory.
pub const DB_FILENAME: &str = "kanban.db";
