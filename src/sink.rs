//! # Delivery Sink
//!
//! The boundary between the timer executor and whatever transport actually
//! delivers notifications. The core fires and forgets; delivery failures are
//! the transport's to log, never retried here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

/// Opaque reference to where notifications go: a conversation, and
/// optionally the message the transport should update in place when the
/// timer completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTarget {
    pub conversation: u64,
    pub message: Option<u64>,
}

impl DeliveryTarget {
    pub fn conversation(conversation: u64) -> Self {
        DeliveryTarget {
            conversation,
            message: None,
        }
    }

    pub fn with_message(conversation: u64, message: u64) -> Self {
        DeliveryTarget {
            conversation,
            message: Some(message),
        }
    }
}

/// Notification sink consumed by the timer executor and reminder scheduler.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// The single terminal notification, fired at the target instant.
    async fn notify_terminal(&self, target: &DeliveryTarget, instant: DateTime<Utc>);

    /// An advance reminder, fired at a configured offset before the target.
    async fn notify_reminder(&self, target: &DeliveryTarget);
}

/// Sink that writes notifications to the log. The default for the console
/// binary and a reasonable stand-in wherever no real transport is wired up.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        LogSink
    }
}

#[async_trait]
impl DeliverySink for LogSink {
    async fn notify_terminal(&self, target: &DeliveryTarget, instant: DateTime<Utc>) {
        match target.message {
            Some(message) => info!(
                "⏰ Time's up! Timer for conversation {} completed (target {}, updating message {message})",
                target.conversation,
                instant.format("%Y-%m-%d %H:%M UTC")
            ),
            None => info!(
                "⏰ Time's up! Timer for conversation {} completed (target {})",
                target.conversation,
                instant.format("%Y-%m-%d %H:%M UTC")
            ),
        }
    }

    async fn notify_reminder(&self, target: &DeliveryTarget) {
        info!(
            "🔔 Reminder for conversation {}: your timer is coming up",
            target.conversation
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// What a [`RecordingSink`] saw, tagged with the conversation id.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Notification {
        Terminal(u64),
        Reminder(u64),
    }

    /// Test double that records every delivery in order.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        notifications: Mutex<Vec<Notification>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            RecordingSink::default()
        }

        pub fn recorded(&self) -> Vec<Notification> {
            self.notifications.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeliverySink for RecordingSink {
        async fn notify_terminal(&self, target: &DeliveryTarget, _instant: DateTime<Utc>) {
            self.notifications
                .lock()
                .unwrap()
                .push(Notification::Terminal(target.conversation));
        }

        async fn notify_reminder(&self, target: &DeliveryTarget) {
            self.notifications
                .lock()
                .unwrap()
                .push(Notification::Reminder(target.conversation));
        }
    }
}
