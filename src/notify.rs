//! Toast-style notifications.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
  Info,
  Success,
  Warning,
  Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
  pub level: NotificationLevel,
  pub message: String,
  pub created_at: DateTime<Utc>,
}

impl Notification {
  pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
    Self {
      level,
      message: message.into(),
      created_at: Utc::now(),
    }
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self::new(NotificationLevel::Info, message)
  }

  pub fn success(message: impl Into<String>) -> Self {
    Self::new(NotificationLevel::Success, message)
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Self::new(NotificationLevel::Warning, message)
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self::new(NotificationLevel::Error, message)
  }

  pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
    now - self.created_at > ttl
  }
}

/// Sink for user-visible notifications
pub trait Notifier: Send + Sync {
  fn notify(&self, notification: Notification);
}

/// Forwards notifications to the TUI event loop
pub struct ChannelNotifier {
  tx: mpsc::UnboundedSender<Event>,
}

impl ChannelNotifier {
  pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
    Self { tx }
  }
}

impl Notifier for ChannelNotifier {
  fn notify(&self, notification: Notification) {
    // Event loop gone means we are shutting down
    let _ = self.tx.send(Event::Notify(notification));
  }
}

/// Logs notifications and echoes problems to stderr (CLI mode)
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, notification: Notification) {
    match notification.level {
      NotificationLevel::Info | NotificationLevel::Success => {
        tracing::info!(message = %notification.message, "notification");
      }
      NotificationLevel::Warning => {
        tracing::warn!(message = %notification.message, "notification");
        eprintln!("warning: {}", notification.message);
      }
      NotificationLevel::Error => {
        tracing::error!(message = %notification.message, "notification");
        eprintln!("error: {}", notification.message);
      }
    }
  }
}

/// Collects notifications for assertions
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
  seen: std::sync::Mutex<Vec<Notification>>,
}

#[cfg(test)]
impl RecordingNotifier {
  pub fn messages(&self) -> Vec<(NotificationLevel, String)> {
    self
      .seen
      .lock()
      .unwrap()
      .iter()
      .map(|n| (n.level, n.message.clone()))
      .collect()
  }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
  fn notify(&self, notification: Notification) {
    self.seen.lock().unwrap().push(notification);
  }
}
