//! Clocks and cancellable one-shot timers.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Source of "now" for reminder decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.lock() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: chrono::TimeDelta) {
        let now = self.now();
        self.set(now + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// A pending one-shot timer. Cancelled on [`TimerHandle::cancel`] or drop.
#[derive(Debug)]
pub struct TimerHandle {
    handle: JoinHandle<()>,
}

impl TimerHandle {
    /// Send `event` on `tx` after `delay`.
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn spawn<E: Send + 'static>(
        delay: Duration,
        tx: mpsc::UnboundedSender<E>,
        event: E,
    ) -> Option<Self> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("cannot arm timer without a tokio runtime: {e}");
                return None;
            }
        };
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone only after the scheduler was dropped.
            let _ = tx.send(event);
        });
        Some(Self { handle })
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Returns `true` once the timer fired or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(chrono::TimeDelta::minutes(5));
        assert_eq!(clock.now(), start + chrono::TimeDelta::minutes(5));
    }

    #[test]
    fn spawn_outside_runtime_returns_none() {
        let (tx, _rx) = mpsc::unbounded_channel::<u8>();
        assert!(TimerHandle::spawn(Duration::from_secs(1), tx, 1).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _timer = TimerHandle::spawn(Duration::from_secs(60), tx, 7u8).unwrap();
        assert_eq!(rx.recv().await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = TimerHandle::spawn(Duration::from_secs(60), tx, 7u8).unwrap();
        timer.cancel();
        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        drop(TimerHandle::spawn(Duration::from_secs(60), tx, 7u8));
        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
