use crate::domain::{Notification, NotificationId};

pub const DEFAULT_PREVIEW_LEN: usize = 100;
pub const DEFAULT_NOTIFICATIONS_ROUTE: &str = "/notifications";

/// What happens when the user clicks a toast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToastAction {
    Navigate { label: String, route: String },
}

/// Transient notice for a newly arrived message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub notification_id: NotificationId,
    pub contact_name: String,
    pub campaign_name: String,
    pub preview: String,
    pub action: ToastAction,
}

/// Settings for building toasts.
#[derive(Clone, Debug)]
pub struct ToastStyle {
    pub preview_len: usize,
    pub route: String,
}

impl Default for ToastStyle {
    fn default() -> Self {
        Self {
            preview_len: DEFAULT_PREVIEW_LEN,
            route: DEFAULT_NOTIFICATIONS_ROUTE.to_string(),
        }
    }
}

impl Toast {
    pub fn for_notification(n: &Notification, style: &ToastStyle) -> Self {
        Self {
            notification_id: n.id.clone(),
            contact_name: n.contact_name.clone(),
            campaign_name: n.campaign_name.clone(),
            preview: truncate_preview(&n.received_message, style.preview_len),
            action: ToastAction::Navigate {
                label: "View".to_string(),
                route: style.route.clone(),
            },
        }
    }
}

/// Cut to `max_chars` characters and append `...` when anything was dropped.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
