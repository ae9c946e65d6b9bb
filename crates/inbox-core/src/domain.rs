use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned notification id.
///
/// The backend is free to use numeric or string keys; we keep whichever form
/// it sent so mutations echo it back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationId {
    Int(i64),
    Text(String),
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationId::Int(v) => write!(f, "{v}"),
            NotificationId::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for NotificationId {
    fn from(v: i64) -> Self {
        NotificationId::Int(v)
    }
}

impl From<&str> for NotificationId {
    fn from(v: &str) -> Self {
        NotificationId::Text(v.to_string())
    }
}

/// What kind of inbound event produced the notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Response,
    Delivery,
    Read,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
    Replied,
}

impl NotificationStatus {
    /// Whether moving from `self` to `next` is a forward transition.
    ///
    /// unread -> read, unread -> replied, read -> replied. Nothing leaves `Replied`.
    pub fn can_transition_to(self, next: NotificationStatus) -> bool {
        use NotificationStatus::*;
        matches!((self, next), (Unread, Read) | (Unread, Replied) | (Read, Replied))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub campaign_name: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub instance_name: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: NotificationKind,
    pub status: NotificationStatus,
    pub received_message: String,
    pub received_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }

    /// Apply a status change if it moves forward. Returns true if applied.
    pub fn advance_status(&mut self, next: NotificationStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Record a locally-sent reply (client clock, not server-confirmed).
    pub fn record_reply(&mut self, message: &str, at: DateTime<Utc>) {
        self.advance_status(NotificationStatus::Replied);
        self.sent_reply = Some(message.to_string());
        self.sent_timestamp = Some(at);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    #[serde(alias = "unread_count")]
    pub unread_count: u64,
}

impl NotificationStats {
    pub fn new(unread_count: u64) -> Self {
        Self { unread_count }
    }

    /// Optimistic decrement; clamps at zero.
    pub fn decrement(&mut self) {
        self.unread_count = self.unread_count.saturating_sub(1);
    }
}
