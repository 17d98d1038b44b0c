//! The three fixed board columns.

use std::cmp::Ordering;

use crate::task::{Task, TaskId, TaskStatus};

/// In-column order: higher priority first, then oldest first.
pub fn column_order(a: &Task, b: &Task) -> Ordering {
    b.priority
        .rank()
        .cmp(&a.priority.rank())
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Sort a column in place. Stable, so full ties keep their order.
pub fn sort_column(tasks: &mut [Task]) {
    tasks.sort_by(column_order);
}

/// One status column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    status: TaskStatus,
    tasks: Vec<Task>,
}

impl Column {
    fn new(status: TaskStatus) -> Self {
        Self {
            status,
            tasks: Vec::new(),
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn key(&self) -> &'static str {
        self.status.key()
    }

    pub fn title(&self) -> &'static str {
        self.status.title()
    }

    /// Tasks in display order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Every task, bucketed by status into exactly one column.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumns {
    columns: [Column; 3],
}

impl Default for BoardColumns {
    fn default() -> Self {
        Self {
            columns: TaskStatus::ALL.map(Column::new),
        }
    }
}

impl BoardColumns {
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut board = Self::default();
        for task in tasks {
            board.columns[task.status.column_index()].tasks.push(task);
        }
        for column in &mut board.columns {
            sort_column(&mut column.tasks);
        }
        board
    }

    pub fn column(&self, status: TaskStatus) -> &Column {
        &self.columns[status.column_index()]
    }

    pub fn columns(&self) -> &[Column; 3] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(Column::is_empty)
    }

    /// All tasks in column order.
    pub fn all_tasks(&self) -> Vec<Task> {
        self.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.columns.iter().flat_map(|column| column.tasks.iter())
    }

    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.iter().find(|task| &task.id == id)
    }

    /// Insert into the task's status column.
    pub fn insert(&mut self, task: Task) {
        let column = &mut self.columns[task.status.column_index()];
        column.tasks.push(task);
        sort_column(&mut column.tasks);
    }

    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        for column in &mut self.columns {
            if let Some(pos) = column.tasks.iter().position(|task| &task.id == id) {
                return Some(column.tasks.remove(pos));
            }
        }
        None
    }

    /// Replace the task with the same id, moving it if its status changed.
    /// Returns the previous version, or `None` if the id was unknown.
    pub fn replace(&mut self, task: Task) -> Option<Task> {
        let previous = self.remove(&task.id)?;
        self.insert(task);
        Some(previous)
    }
}
