use async_trait::async_trait;

use crate::{
    api_error::ApiError,
    domain::{Notification, NotificationId, NotificationStats},
    toast::Toast,
};

/// Hexagonal port for the remote notifications backend.
///
/// Implementations decode every failure into [`ApiError`] before returning.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Notifications in server order. `limit = Some(1)` yields the most recent one.
    async fn list(&self, limit: Option<usize>) -> Result<Vec<Notification>, ApiError>;

    async fn unread_count(&self) -> Result<NotificationStats, ApiError>;

    async fn mark_as_read(&self, id: &NotificationId) -> Result<(), ApiError>;

    async fn mark_all_as_read(&self) -> Result<(), ApiError>;

    async fn reply(&self, id: &NotificationId, message: &str) -> Result<(), ApiError>;
}

/// User-visible notice surface (toasts, error banners).
pub trait Notifier: Send + Sync {
    fn toast(&self, toast: Toast);
    fn error(&self, message: &str);
    fn success(&self, message: &str);
}
