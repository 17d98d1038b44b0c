//! Search and filter over board tasks.

use std::collections::BTreeSet;

use crate::task::{Priority, Task};

/// Board search/filter settings. The default matches every task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive substring of title or description.
    pub search: String,
    /// `None` matches every priority.
    pub priority: Option<Priority>,
    /// `None` matches every tag set.
    pub tag: Option<String>,
}

impl TaskFilter {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.priority.is_none() && self.tag.is_none()
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(priority) = self.priority
            && task.priority != priority
        {
            return false;
        }
        if let Some(tag) = &self.tag
            && !task.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
        {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        task.title.to_lowercase().contains(&needle)
            || task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

/// Every distinct tag, sorted.
pub fn available_tags<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<String> {
    tasks
        .into_iter()
        .flat_map(|task| task.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
