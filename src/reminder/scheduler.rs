//! Per-task reminder scheduling.
//!
//! Each task id has at most one pending timer and produces at most one
//! reminder until [`ReminderScheduler::reset_task`] clears it. With
//! `remaining = due - now`:
//!
//! - `0 < remaining <= lead`: deliver now.
//! - `remaining > lead`: arm a timer for `due - lead`.
//! - `remaining <= 0`: nothing.
//!
//! Timers only send a [`FiredEvent`]; delivery happens when the owner
//! drives [`ReminderScheduler::next_fired`] or
//! [`ReminderScheduler::dispatch_ready`]. Events from timers that were
//! cancelled or re-armed in the meantime are discarded by generation.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::notifier::{DeliveryOutcome, NotificationPermission, Notifier, deliver};
use super::timer::{Clock, SystemClock, TimerHandle};
use super::DEFAULT_LEAD;
use crate::task::{Task, TaskId};

/// A reminder for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: TaskId,
    pub title: String,
    pub due_date: DateTime<Utc>,
    /// Lead time the reminder was scheduled with.
    pub lead: Duration,
}

impl Reminder {
    fn for_task(task: &Task, due_date: DateTime<Utc>, lead: Duration) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            due_date,
            lead,
        }
    }

    /// Notification text, e.g. `Deadline in 15 minutes: Ship release`.
    pub fn message(&self) -> String {
        format!(
            "Deadline in {} minutes: {}",
            self.lead.as_secs() / 60,
            self.title
        )
    }
}

/// Reminder state of a task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    Unscheduled,
    Armed,
    Notified,
}

/// Event sent by a timer when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredEvent {
    pub task_id: TaskId,
    generation: u64,
}

struct Armed {
    timer: TimerHandle,
    generation: u64,
    reminder: Reminder,
}

/// Schedules and delivers due-date reminders.
pub struct ReminderScheduler {
    lead: Duration,
    enabled: bool,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    notified: HashSet<TaskId>,
    armed: HashMap<TaskId, Armed>,
    next_generation: u64,
    fired_tx: mpsc::UnboundedSender<FiredEvent>,
    fired_rx: mpsc::UnboundedReceiver<FiredEvent>,
}

impl ReminderScheduler {
    /// Scheduler with the default 15 minute lead on the system clock.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self::with_clock(notifier, Arc::new(SystemClock), DEFAULT_LEAD)
    }

    pub fn with_clock(notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>, lead: Duration) -> Self {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        Self {
            lead,
            enabled: true,
            clock,
            notifier,
            notified: HashSet::new(),
            armed: HashMap::new(),
            next_generation: 0,
            fired_tx,
            fired_rx,
        }
    }

    /// Disable scheduling; `setup_notifications` then only clears timers.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn lead(&self) -> Duration {
        self.lead
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Ask for notification permission if it is still undecided.
    pub fn request_permission_if_undecided(&self) -> NotificationPermission {
        match self.notifier.permission() {
            NotificationPermission::Default => {
                let permission = self.notifier.request_permission();
                info!(?permission, "notification permission requested");
                permission
            }
            permission => permission,
        }
    }

    /// Re-evaluate every task: clears pending timers, then delivers or arms
    /// reminders. Returns the reminders delivered immediately.
    pub fn setup_notifications(&mut self, tasks: &[Task]) -> Vec<Reminder> {
        self.clear_all_timeouts();
        if !self.enabled {
            return Vec::new();
        }

        let now = self.clock.now();
        let mut delivered = Vec::new();
        for task in tasks {
            if let Some(reminder) = self.schedule(task, now) {
                delivered.push(reminder);
            }
        }
        debug!(
            delivered = delivered.len(),
            armed = self.armed.len(),
            "reminders set up"
        );
        delivered
    }

    /// Forget that `id` was notified and cancel its timer.
    pub fn reset_task(&mut self, id: &TaskId) {
        self.notified.remove(id);
        if let Some(armed) = self.armed.remove(id) {
            armed.timer.cancel();
            debug!(task_id = %id, "reminder timer cancelled");
        }
    }

    /// Cancel every pending timer. The notified set is kept.
    pub fn clear_all_timeouts(&mut self) {
        for (_, armed) in self.armed.drain() {
            armed.timer.cancel();
        }
    }

    pub fn state(&self, id: &TaskId) -> ReminderState {
        if self.notified.contains(id) {
            ReminderState::Notified
        } else if self.armed.contains_key(id) {
            ReminderState::Armed
        } else {
            ReminderState::Unscheduled
        }
    }

    /// Number of pending timers.
    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    /// Wait for the next timer and deliver it.
    ///
    /// Returns `None` when no timer is pending.
    pub async fn next_fired(&mut self) -> Option<Reminder> {
        loop {
            if self.armed.is_empty() {
                return None;
            }
            let event = self.fired_rx.recv().await?;
            if let Some(reminder) = self.on_fired(event) {
                return Some(reminder);
            }
        }
    }

    /// Deliver every timer that already fired, without waiting.
    pub fn dispatch_ready(&mut self) -> Vec<Reminder> {
        let mut delivered = Vec::new();
        while let Ok(event) = self.fired_rx.try_recv() {
            if let Some(reminder) = self.on_fired(event) {
                delivered.push(reminder);
            }
        }
        delivered
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn schedule(&mut self, task: &Task, now: DateTime<Utc>) -> Option<Reminder> {
        if !task.wants_reminder() {
            return None;
        }
        let due = task.due_date?;
        // Non-positive remaining time fails the conversion.
        let remaining = (due - now).to_std().ok().filter(|r| !r.is_zero())?;

        if remaining <= self.lead {
            if self.notified.contains(&task.id) {
                return None;
            }
            let reminder = Reminder::for_task(task, due, self.lead);
            self.notify(&reminder);
            return Some(reminder);
        }

        let delay = remaining - self.lead;
        let generation = self.next_generation;
        self.next_generation += 1;
        let event = FiredEvent {
            task_id: task.id.clone(),
            generation,
        };
        if let Some(timer) = TimerHandle::spawn(delay, self.fired_tx.clone(), event) {
            debug!(task_id = %task.id, delay_secs = delay.as_secs(), "reminder armed");
            self.armed.insert(
                task.id.clone(),
                Armed {
                    timer,
                    generation,
                    reminder: Reminder::for_task(task, due, self.lead),
                },
            );
        }
        None
    }

    fn on_fired(&mut self, event: FiredEvent) -> Option<Reminder> {
        let current = self
            .armed
            .get(&event.task_id)
            .is_some_and(|armed| armed.generation == event.generation);
        if !current {
            debug!(task_id = %event.task_id, "discarding stale reminder event");
            return None;
        }
        let armed = self.armed.remove(&event.task_id)?;
        if self.notified.contains(&event.task_id) {
            return None;
        }
        self.notify(&armed.reminder);
        Some(armed.reminder)
    }

    fn notify(&mut self, reminder: &Reminder) {
        self.notified.insert(reminder.task_id.clone());
        let outcome = deliver(self.notifier.as_ref(), reminder);
        match outcome {
            DeliveryOutcome::Suppressed => {
                debug!(task_id = %reminder.task_id, "reminder marked notified without display");
            }
            _ => info!(task_id = %reminder.task_id, ?outcome, "reminder delivered"),
        }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.clear_all_timeouts();
    }
}
