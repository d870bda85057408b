use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{NotificationPriority, NotificationStatus, NotificationType};
use crate::mock_api::{ApiError, Patch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub priority: NotificationPriority,
    pub status: NotificationStatus,
    pub title: String,
    pub message: String,
    /// Untyped payload pointing at whatever the notification is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

entity!(Notification, "Notification");

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub action_url: Option<String>,
}

impl NewNotification {
    pub fn into_notification(self, id: String, now: DateTime<Utc>) -> Notification {
        Notification {
            id,
            user_id: self.user_id,
            kind: self.kind,
            priority: self.priority,
            status: NotificationStatus::Unread,
            title: self.title,
            message: self.message,
            data: self.data,
            action_url: self.action_url,
            read_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationUpdate {
    pub status: Option<NotificationStatus>,
    pub read_at: Option<DateTime<Utc>>,
    pub priority: Option<NotificationPriority>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub data: Option<serde_json::Value>,
    pub action_url: Option<String>,
}

impl NotificationUpdate {
    pub fn read(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(NotificationStatus::Read),
            read_at: Some(at),
            ..Self::default()
        }
    }

    pub fn archived() -> Self {
        Self {
            status: Some(NotificationStatus::Archived),
            ..Self::default()
        }
    }
}

impl Patch<Notification> for NotificationUpdate {
    fn apply(self, notification: &mut Notification) -> Result<(), ApiError> {
        let mut src = self;
        // Reading an archived notification stamps it but keeps it archived.
        if notification.status == NotificationStatus::Archived
            && src.status == Some(NotificationStatus::Read)
        {
            src.status = None;
        }
        merge_fields!(src => notification;
            status, priority, title, message;
            optional read_at, data, action_url);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationFilters {
    #[serde(rename = "type")]
    pub kind: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
    pub status: Option<NotificationStatus>,
}

impl NotificationFilters {
    pub fn matches(&self, n: &Notification) -> bool {
        self.kind.map_or(true, |k| n.kind == k)
            && self.priority.map_or(true, |p| n.priority == p)
            && self.status.map_or(true, |s| n.status == s)
    }
}
