//! Count-only companion to [`crate::store::NotificationStore`].
//!
//! Used where only the unread badge is shown; it never fetches the list.

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use crate::{
    domain::NotificationStats,
    polling::{spawn_poller, PollingHandle},
    ports::NotificationApi,
};

pub struct UnreadBadge {
    api: Arc<dyn NotificationApi>,
    tx: watch::Sender<NotificationStats>,
}

impl UnreadBadge {
    pub fn new(api: Arc<dyn NotificationApi>) -> Self {
        let (tx, _rx) = watch::channel(NotificationStats::default());
        Self { api, tx }
    }

    pub fn unread_count(&self) -> u64 {
        self.tx.borrow().unread_count
    }

    /// Receiver that observes every count change.
    pub fn subscribe(&self) -> watch::Receiver<NotificationStats> {
        self.tx.subscribe()
    }

    /// Fetch the unread count. Failures keep the last known value.
    pub async fn refresh(&self) {
        match self.api.unread_count().await {
            Ok(stats) => {
                self.tx.send_if_modified(|cur| {
                    let changed = *cur != stats;
                    *cur = stats;
                    changed
                });
            }
            Err(e) => tracing::warn!(error = %e, "failed to refresh unread count"),
        }
    }

    /// Refresh now, then every `period`.
    pub fn start_polling(self: &Arc<Self>, period: Duration) -> PollingHandle {
        let first = Arc::clone(self);
        let badge = Arc::clone(self);
        spawn_poller(
            "unread-badge",
            period,
            move || async move { first.refresh().await },
            move || {
                let badge = Arc::clone(&badge);
                async move { badge.refresh().await }
            },
        )
    }
}
