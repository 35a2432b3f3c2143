//! Notification Channel
//!
//! One slot, last writer wins. A notification is visible for its severity's
//! duration, then spends the exit transition in `Leaving`, then is gone.
//! Expiry is evaluated against the tokio clock whenever the slot is read.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::NotificationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
    Info,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Success => "✅",
            Severity::Warning | Severity::Error => "⚠️",
            Severity::Info => "ℹ️",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Showing,
    Leaving,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub severity: Severity,
    pub message: String,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveNotification {
    #[serde(flatten)]
    pub notification: Notification,
    pub phase: Phase,
}

struct Slot {
    notification: Notification,
    shown_at: Instant,
    visible_for: Duration,
}

pub struct Notifier {
    config: NotificationConfig,
    slot: Mutex<Option<Slot>>,
}

impl Notifier {
    pub fn new(config: NotificationConfig) -> Self {
        Self { config, slot: Mutex::new(None) }
    }

    pub fn duration_for(&self, severity: Severity) -> Duration {
        let ms = match severity {
            Severity::Success => self.config.success_ms,
            Severity::Warning => self.config.warning_ms,
            Severity::Error => self.config.error_ms,
            Severity::Info => self.config.info_ms,
        };
        Duration::from_millis(ms)
    }

    /// Post a notification, retiring whatever is currently in the slot.
    pub fn post(&self, severity: Severity, message: impl Into<String>) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            severity,
            message: message.into(),
            posted_at: Utc::now(),
        };

        match severity {
            Severity::Error => tracing::error!(message = %notification.message, "notification"),
            Severity::Warning => tracing::warn!(message = %notification.message, "notification"),
            Severity::Success | Severity::Info => tracing::info!(message = %notification.message, "notification"),
        }

        let retired = self.slot.lock().replace(Slot {
            notification: notification.clone(),
            shown_at: Instant::now(),
            visible_for: self.duration_for(severity),
        });
        if let Some(old) = retired {
            tracing::trace!(id = %old.notification.id, "notification retired");
        }

        notification
    }

    pub fn success(&self, message: impl Into<String>) -> Notification {
        self.post(Severity::Success, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> Notification {
        self.post(Severity::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Notification {
        self.post(Severity::Error, message)
    }

    pub fn info(&self, message: impl Into<String>) -> Notification {
        self.post(Severity::Info, message)
    }

    /// The occupant of the slot, if it has not fully exited yet.
    pub fn current(&self) -> Option<ActiveNotification> {
        let mut slot = self.slot.lock();
        let elapsed = slot.as_ref()?.shown_at.elapsed();
        let exit = Duration::from_millis(self.config.exit_ms);

        let phase = match slot.as_ref() {
            Some(s) if elapsed < s.visible_for => Phase::Showing,
            Some(s) if elapsed < s.visible_for + exit => Phase::Leaving,
            _ => {
                *slot = None;
                return None;
            }
        };

        slot.as_ref().map(|s| ActiveNotification {
            notification: s.notification.clone(),
            phase,
        })
    }

    pub fn dismiss(&self) {
        self.slot.lock().take();
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(NotificationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_last_writer_wins() {
        let notifier = Notifier::default();
        notifier.success("first");
        let second = notifier.warning("second");

        let current = notifier.current().unwrap();
        assert_eq!(current.notification.id, second.id);
        assert_eq!(current.notification.message, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_dismiss_with_exit_phase() {
        let notifier = Notifier::default();
        notifier.info("hello");

        tokio::time::advance(Duration::from_millis(2999)).await;
        assert_eq!(notifier.current().unwrap().phase, Phase::Showing);

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(notifier.current().unwrap().phase, Phase::Leaving);

        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(notifier.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacement_restarts_the_clock() {
        let notifier = Notifier::default();
        notifier.success("one");
        tokio::time::advance(Duration::from_millis(4900)).await;
        notifier.success("two");
        tokio::time::advance(Duration::from_millis(4900)).await;

        let current = notifier.current().unwrap();
        assert_eq!(current.notification.message, "two");
        assert_eq!(current.phase, Phase::Showing);
    }
}
