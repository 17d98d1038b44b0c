//! Due-date reminders.
//!
//! Sub-modules:
//! - `timer`: clocks and cancellable one-shot timers.
//! - `notifier`: the notification channel and its permission model.
//! - `scheduler`: per-task reminder policy and dispatch.

pub mod notifier;
pub mod scheduler;
pub mod timer;

pub use notifier::{
    ChannelNotifier, ConsoleNotifier, DeliveryOutcome, Notice, NotificationPermission, Notifier,
    deliver,
};
pub use scheduler::{Reminder, ReminderScheduler, ReminderState};
pub use timer::{Clock, FixedClock, SystemClock, TimerHandle};

/// Default lead time between a reminder and its due date.
pub const DEFAULT_LEAD: std::time::Duration = std::time::Duration::from_secs(15 * 60);
