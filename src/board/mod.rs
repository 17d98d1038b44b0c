//! Three-column board view model.
//!
//! Sub-modules:
//! - `column`: fixed status columns and their sort order.
//! - `filter`: search and priority/tag filtering.
//! - `controller`: `BoardController`, optimistic mutations and reconciliation.

pub mod column;
pub mod controller;
pub mod filter;

pub use column::{BoardColumns, Column, column_order, sort_column};
pub use controller::{BoardController, PendingMutation};
pub use filter::{TaskFilter, available_tags};
