//! Notification channel for reminders.
//!
//! Delivery is best effort. An unsupported channel degrades to a blocking
//! text alert; a channel without permission shows nothing.

use std::io::Write;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::scheduler::Reminder;
use crate::error::{KanbanError, Result};

/// Heading shown on reminder notifications.
pub const NOTIFICATION_TITLE: &str = "Task reminder";

/// Permission state of the notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// Not decided yet; may be requested.
    #[default]
    Default,
    /// The platform has no notification channel.
    Unsupported,
}

/// How a reminder reached the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Shown,
    Alerted,
    Suppressed,
}

/// A notification channel.
pub trait Notifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    /// Ask the user for permission; returns the resulting state.
    fn request_permission(&self) -> NotificationPermission;

    /// Show a notification. Only called with [`NotificationPermission::Granted`].
    fn show(&self, reminder: &Reminder) -> Result<()>;

    /// Blocking text alert used when notifications are unsupported.
    fn alert(&self, text: &str);
}

/// Deliver `reminder` through `notifier` according to its permission.
pub fn deliver(notifier: &dyn Notifier, reminder: &Reminder) -> DeliveryOutcome {
    match notifier.permission() {
        NotificationPermission::Unsupported => {
            notifier.alert(&reminder.message());
            DeliveryOutcome::Alerted
        }
        NotificationPermission::Granted => match notifier.show(reminder) {
            Ok(()) => DeliveryOutcome::Shown,
            Err(e) => {
                warn!(task_id = %reminder.task_id, "notification failed, alerting instead: {e}");
                notifier.alert(&reminder.message());
                DeliveryOutcome::Alerted
            }
        },
        permission => {
            debug!(task_id = %reminder.task_id, ?permission, "reminder suppressed");
            DeliveryOutcome::Suppressed
        }
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Terminal notifier: notifications on stdout, alerts on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn request_permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn show(&self, reminder: &Reminder) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "🔔 {NOTIFICATION_TITLE}: {}", reminder.message())?;
        out.flush()?;
        Ok(())
    }

    fn alert(&self, text: &str) {
        eprintln!("{text}");
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A notice emitted by [`ChannelNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Shown(Reminder),
    Alert(String),
}

/// Forwards notices to an mpsc receiver.
#[derive(Debug)]
pub struct ChannelNotifier {
    permission: Mutex<NotificationPermission>,
    on_request: NotificationPermission,
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    /// Create a notifier in the given permission state. Requests from the
    /// `Default` state are granted.
    pub fn new(permission: NotificationPermission) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = Self {
            permission: Mutex::new(permission),
            on_request: NotificationPermission::Granted,
            tx,
        };
        (notifier, rx)
    }

    /// State a pending permission request resolves to.
    pub fn with_request_outcome(mut self, outcome: NotificationPermission) -> Self {
        self.on_request = outcome;
        self
    }

    fn set_permission(&self, permission: NotificationPermission) {
        match self.permission.lock() {
            Ok(mut guard) => *guard = permission,
            Err(poisoned) => *poisoned.into_inner() = permission,
        }
    }
}

impl Notifier for ChannelNotifier {
    fn permission(&self) -> NotificationPermission {
        match self.permission.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn request_permission(&self) -> NotificationPermission {
        let current = self.permission();
        if current != NotificationPermission::Default {
            return current;
        }
        self.set_permission(self.on_request);
        self.on_request
    }

    fn show(&self, reminder: &Reminder) -> Result<()> {
        self.tx
            .send(Notice::Shown(reminder.clone()))
            .map_err(|_| KanbanError::Scheduler("notice receiver closed".to_owned()))
    }

    fn alert(&self, text: &str) {
        if self.tx.send(Notice::Alert(text.to_owned())).is_err() {
            warn!("notice receiver closed, dropping alert");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::task::TaskId;
    use chrono::Utc;

    fn reminder() -> Reminder {
        Reminder {
            task_id: TaskId::from(1),
            title: "Ship".to_owned(),
            due_date: Utc::now(),
            lead: super::super::DEFAULT_LEAD,
        }
    }

    #[test]
    fn granted_permission_shows() {
        let (notifier, mut rx) = ChannelNotifier::new(NotificationPermission::Granted);
        assert_eq!(deliver(&notifier, &reminder()), DeliveryOutcome::Shown);
        assert!(matches!(rx.try_recv().unwrap(), Notice::Shown(r) if r.title == "Ship"));
    }

    #[test]
    fn unsupported_channel_alerts() {
        let (notifier, mut rx) = ChannelNotifier::new(NotificationPermission::Unsupported);
        assert_eq!(deliver(&notifier, &reminder()), DeliveryOutcome::Alerted);
        assert_eq!(
            rx.try_recv().unwrap(),
            Notice::Alert("Deadline in 15 minutes: Ship".to_owned())
        );
    }

    #[test]
    fn missing_permission_is_silent() {
        for permission in [NotificationPermission::Denied, NotificationPermission::Default] {
            let (notifier, mut rx) = ChannelNotifier::new(permission);
            assert_eq!(deliver(&notifier, &reminder()), DeliveryOutcome::Suppressed);
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn request_only_changes_undecided_permission() {
        let (notifier, _rx) = ChannelNotifier::new(NotificationPermission::Default);
        assert_eq!(notifier.request_permission(), NotificationPermission::Granted);
        assert_eq!(notifier.permission(), NotificationPermission::Granted);

        let (notifier, _rx) = ChannelNotifier::new(NotificationPermission::Denied);
        assert_eq!(notifier.request_permission(), NotificationPermission::Denied);
    }
}
