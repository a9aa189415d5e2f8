//! User notifications.
//!
//! Call sites get a [`NotificationSink`] injected and fire-and-forget a
//! `(kind, message)` pair. The [`EventBus`] sink fans notices out to SSE
//! clients; subscribing returns a receiver and dropping it unsubscribes.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Info => "info",
            NoticeKind::Success => "success",
            NoticeKind::Warning => "warning",
            NoticeKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            kind,
            message: message.into(),
            timestamp,
        }
    }
}

/// Fire-and-forget user notification.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Broadcasts notices to every subscriber.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Notice>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl NotificationSink for EventBus {
    fn notify(&self, kind: NoticeKind, message: &str) {
        if self.sender.send(Notice::new(kind, message)).is_err() {
            TracingSink.notify(kind, message);
        } else {
            tracing::debug!("notice [{}] {}", kind.as_str(), message);
        }
    }
}

/// Logs notices instead of delivering them. Used when nobody listens.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Error => tracing::error!("{}", message),
            NoticeKind::Warning => tracing::warn!("{}", message),
            NoticeKind::Info | NoticeKind::Success => tracing::info!("{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_without_subscribers() {
        let bus = EventBus::new(8);
        bus.notify(NoticeKind::Info, "nobody listening");
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_and_drop() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.notify(NoticeKind::Success, "Imported weather-mcp");
        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.message, "Imported weather-mcp");
        assert!(notice.timestamp > 0);

        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_sink_is_object_safe() {
        let sinks: Vec<Box<dyn NotificationSink>> = vec![Box::new(TracingSink), Box::new(EventBus::new(4))];
        for sink in &sinks {
            sink.notify(NoticeKind::Warning, "search returned no results");
        }
    }

    #[test]
    fn test_notice_serialization() {
        let json = serde_json::to_string(&Notice::new(NoticeKind::Error, "boom")).unwrap();
        assert!(json.contains("\"kind\":\"error\""));
    }
}
