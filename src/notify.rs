use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// User-visible feedback handed to whatever draws toasts.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Fire-and-forget sink; nothing is acknowledged back to the store.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Logs every notification and keeps it until a UI drains the buffer.
#[derive(Debug, Default)]
pub struct BufferedSink {
    pending: Mutex<Vec<Notification>>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl NotificationSink for BufferedSink {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            title = %notification.title,
            message = %notification.message,
            "notification"
        );
        match self.pending.lock() {
            Ok(mut pending) => pending.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}
