//! Banner notifications.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Default number of notifications kept by the ui slice.
pub const DEFAULT_NOTIFICATION_CAP: usize = 5;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

/// A transient message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = Notification::info("a");
        let b = Notification::info("a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_wire_shape() {
        let notification = Notification::error("boom").at(42);
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["timestamp"], 42);
    }
}
