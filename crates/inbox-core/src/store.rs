//! Client-side cache of notifications + unread counter.
//!
//! The remote API is the source of truth. Reads replace local state wholesale;
//! mutations apply optimistically and are reconciled by the next poll. A failed
//! mutation does not roll back: local state stays ahead of the server until
//! the next `fetch_all` / `check_for_new`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    domain::{Notification, NotificationId, NotificationStats, NotificationStatus},
    ports::{NotificationApi, Notifier},
    toast::{Toast, ToastStyle},
};

const MSG_EMPTY_REPLY: &str = "Reply message cannot be empty.";
const MSG_REPLY_SENT: &str = "Reply sent.";

#[derive(Clone, Debug, Default)]
pub struct StoreSnapshot {
    pub notifications: Vec<Notification>,
    pub stats: NotificationStats,
    pub loading: bool,
    pub last_checked: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct StoreState {
    notifications: Vec<Notification>,
    stats: NotificationStats,
    loading: bool,
    last_checked: Option<DateTime<Utc>>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            notifications: Vec::new(),
            stats: NotificationStats::default(),
            // Nothing fetched yet.
            loading: true,
            last_checked: None,
        }
    }
}

pub struct NotificationStore {
    api: Arc<dyn NotificationApi>,
    notifier: Arc<dyn Notifier>,
    toast_style: ToastStyle,
    state: Mutex<StoreState>,
}

impl NotificationStore {
    pub fn new(api: Arc<dyn NotificationApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_toast_style(api, notifier, ToastStyle::default())
    }

    pub fn with_toast_style(
        api: Arc<dyn NotificationApi>,
        notifier: Arc<dyn Notifier>,
        toast_style: ToastStyle,
    ) -> Self {
        Self {
            api,
            notifier,
            toast_style,
            state: Mutex::new(StoreState::default()),
        }
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let st = self.state.lock().await;
        StoreSnapshot {
            notifications: st.notifications.clone(),
            stats: st.stats,
            loading: st.loading,
            last_checked: st.last_checked,
        }
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notifications.clone()
    }

    pub async fn unread(&self) -> Vec<Notification> {
        self.state
            .lock()
            .await
            .notifications
            .iter()
            .filter(|n| n.is_unread())
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> NotificationStats {
        self.state.lock().await.stats
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub async fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.last_checked
    }

    /// Reload the full list and unread count. Failures are logged, not returned.
    pub async fn fetch_all(&self) {
        let (list, stats) = tokio::join!(self.api.list(None), self.api.unread_count());

        let mut st = self.state.lock().await;
        match (list, stats) {
            (Ok(notifications), Ok(stats)) => {
                tracing::debug!(
                    count = notifications.len(),
                    unread = stats.unread_count,
                    "notifications refreshed"
                );
                st.notifications = notifications;
                st.stats = stats;
                st.last_checked = Some(Utc::now());
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "failed to fetch notifications");
            }
        }
        st.loading = false;
    }

    /// Poll the unread count and toast the newest notification if it went up.
    ///
    /// A rise from zero is not toasted, so a cold start never produces a burst.
    pub async fn check_for_new(&self) {
        let fresh = match self.api.unread_count().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to check for new notifications");
                return;
            }
        };

        let previous = {
            let mut st = self.state.lock().await;
            let previous = st.stats.unread_count;
            st.stats = fresh;
            previous
        };

        if fresh.unread_count <= previous || previous == 0 {
            return;
        }

        tracing::info!(previous, current = fresh.unread_count, "new notifications");
        match self.api.list(Some(1)).await {
            Ok(latest) => {
                if let Some(n) = latest.first() {
                    self.notifier
                        .toast(Toast::for_notification(n, &self.toast_style));
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to fetch latest notification"),
        }
    }

    /// Optimistically mark one notification read, then tell the server.
    ///
    /// The counter drops by one even when the id is not in the local list
    /// (e.g. it was only seen through a toast); the next poll reconciles it.
    pub async fn mark_as_read(&self, id: &NotificationId) -> bool {
        {
            let mut st = self.state.lock().await;
            if let Some(n) = st.notifications.iter_mut().find(|n| &n.id == id) {
                n.advance_status(NotificationStatus::Read);
            }
            st.stats.decrement();
        }

        match self.api.mark_as_read(id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%id, error = %e, "mark as read failed");
                self.notifier.error(&e.user_message());
                false
            }
        }
    }

    /// Optimistically mark everything read, then tell the server.
    pub async fn mark_all_as_read(&self) -> bool {
        {
            let mut st = self.state.lock().await;
            for n in st.notifications.iter_mut() {
                n.advance_status(NotificationStatus::Read);
            }
            st.stats.unread_count = 0;
        }

        match self.api.mark_all_as_read().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "mark all as read failed");
                self.notifier.error(&e.user_message());
                false
            }
        }
    }

    /// Send a reply; local state changes only once the server accepted it.
    pub async fn reply_to_notification(&self, id: &NotificationId, message: &str) -> bool {
        if message.trim().is_empty() {
            self.notifier.error(MSG_EMPTY_REPLY);
            return false;
        }

        if let Err(e) = self.api.reply(id, message).await {
            tracing::warn!(%id, error = %e, "reply failed");
            self.notifier.error(&e.user_message());
            return false;
        }

        {
            let mut st = self.state.lock().await;
            if let Some(n) = st.notifications.iter_mut().find(|n| &n.id == id) {
                n.record_reply(message, Utc::now());
            }
        }
        self.notifier.success(MSG_REPLY_SENT);
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        api_error::{ApiError, NetworkFailure},
        domain::NotificationKind,
    };
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    pub(crate) fn notification(id: i64, status: NotificationStatus, msg: &str) -> Notification {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        Notification {
            id: NotificationId::Int(id),
            campaign_name: "Spring promo".to_string(),
            contact_name: format!("Contact {id}"),
            contact_phone: "+5511999990000".to_string(),
            instance_name: "main".to_string(),
            kind: NotificationKind::Response,
            status,
            received_message: msg.to_string(),
            received_timestamp: at,
            sent_reply: None,
            sent_timestamp: None,
            sent_by_name: None,
            created_at: at,
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub list: StdMutex<Vec<Notification>>,
        pub counts: StdMutex<VecDeque<Result<u64, ApiError>>>,
        pub fail_list: StdMutex<bool>,
        pub fail_mutations: StdMutex<Option<ApiError>>,
        pub calls: StdMutex<Vec<String>>,
    }

    impl FakeApi {
        pub fn push_count(&self, v: u64) {
            self.counts.lock().unwrap().push_back(Ok(v));
        }

        pub fn set_list(&self, list: Vec<Notification>) {
            *self.list.lock().unwrap() = list;
        }

        pub fn fail_mutations_with(&self, e: ApiError) {
            *self.fail_mutations.lock().unwrap() = Some(e);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn mutation_result(&self) -> Result<(), ApiError> {
            match self.fail_mutations.lock().unwrap().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl NotificationApi for FakeApi {
        async fn list(&self, limit: Option<usize>) -> Result<Vec<Notification>, ApiError> {
            self.record(format!("list:{limit:?}"));
            if *self.fail_list.lock().unwrap() {
                return Err(ApiError::network(NetworkFailure::Unreachable));
            }
            let list = self.list.lock().unwrap().clone();
            Ok(match limit {
                Some(n) => list.into_iter().take(n).collect(),
                None => list,
            })
        }

        async fn unread_count(&self) -> Result<NotificationStats, ApiError> {
            self.record("unread_count");
            let next = self.counts.lock().unwrap().pop_front();
            match next {
                Some(Ok(v)) => Ok(NotificationStats::new(v)),
                Some(Err(e)) => Err(e),
                None => Ok(NotificationStats::default()),
            }
        }

        async fn mark_as_read(&self, id: &NotificationId) -> Result<(), ApiError> {
            self.record(format!("mark_as_read:{id}"));
            self.mutation_result()
        }

        async fn mark_all_as_read(&self) -> Result<(), ApiError> {
            self.record("mark_all_as_read");
            self.mutation_result()
        }

        async fn reply(&self, id: &NotificationId, message: &str) -> Result<(), ApiError> {
            self.record(format!("reply:{id}:{message}"));
            self.mutation_result()
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeNotifier {
        pub toasts: StdMutex<Vec<Toast>>,
        pub errors: StdMutex<Vec<String>>,
        pub successes: StdMutex<Vec<String>>,
    }

    impl FakeNotifier {
        pub fn toasts(&self) -> Vec<Toast> {
            self.toasts.lock().unwrap().clone()
        }

        pub fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }
    }

    impl Notifier for FakeNotifier {
        fn toast(&self, toast: Toast) {
            self.toasts.lock().unwrap().push(toast);
        }

        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        fn success(&self, message: &str) {
            self.successes.lock().unwrap().push(message.to_string());
        }
    }

    fn store_with(
        list: Vec<Notification>,
        counts: &[u64],
    ) -> (NotificationStore, Arc<FakeApi>, Arc<FakeNotifier>) {
        let api = Arc::new(FakeApi::default());
        api.set_list(list);
        for c in counts {
            api.push_count(*c);
        }
        let notifier = Arc::new(FakeNotifier::default());
        let store = NotificationStore::new(api.clone(), notifier.clone());
        (store, api, notifier)
    }

    #[tokio::test]
    async fn fetch_all_replaces_state_in_server_order() {
        let n1 = notification(1, NotificationStatus::Unread, "first");
        let n2 = notification(2, NotificationStatus::Read, "second");
        let (store, _api, _notifier) = store_with(vec![n1.clone(), n2.clone()], &[1]);

        assert!(store.is_loading().await);
        store.fetch_all().await;

        let snap = store.snapshot().await;
        assert_eq!(snap.notifications, vec![n1, n2]);
        assert_eq!(snap.stats.unread_count, 1);
        assert!(!snap.loading);
        assert!(snap.last_checked.is_some());
    }

    #[tokio::test]
    async fn fetch_all_failure_keeps_stale_state() {
        let n1 = notification(1, NotificationStatus::Unread, "first");
        let (store, api, notifier) = store_with(vec![n1.clone()], &[1]);
        store.fetch_all().await;

        api.set_list(vec![]);
        *api.fail_list.lock().unwrap() = true;
        api.push_count(9);
        store.fetch_all().await;

        let snap = store.snapshot().await;
        assert_eq!(snap.notifications, vec![n1]);
        assert_eq!(snap.stats.unread_count, 1);
        assert!(!snap.loading);
        assert!(notifier.errors().is_empty());
    }

    #[tokio::test]
    async fn cold_start_rise_is_not_toasted() {
        let latest = notification(9, NotificationStatus::Unread, "hello");
        let (store, api, notifier) = store_with(vec![latest], &[5]);

        store.check_for_new().await;

        assert!(notifier.toasts().is_empty());
        assert_eq!(store.stats().await.unread_count, 5);
        assert!(!api.calls().iter().any(|c| c.starts_with("list")));
    }

    #[tokio::test]
    async fn rise_from_nonzero_toasts_latest_once() {
        let latest = notification(9, NotificationStatus::Unread, &"x".repeat(120));
        let older = notification(8, NotificationStatus::Unread, "older");
        let (store, api, notifier) = store_with(vec![latest, older], &[2, 5]);

        store.check_for_new().await;
        assert!(notifier.toasts().is_empty());

        store.check_for_new().await;
        let toasts = notifier.toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].notification_id, NotificationId::Int(9));
        assert_eq!(toasts[0].contact_name, "Contact 9");
        assert!(toasts[0].preview.ends_with("..."));
        assert_eq!(
            toasts[0].action,
            crate::toast::ToastAction::Navigate {
                label: "View".to_string(),
                route: "/notifications".to_string(),
            }
        );
        assert!(api.calls().contains(&"list:Some(1)".to_string()));
        assert_eq!(store.stats().await.unread_count, 5);
    }

    #[tokio::test]
    async fn lower_count_overwrites_stats_without_toast() {
        let (store, _api, notifier) = store_with(vec![], &[4, 1]);
        store.check_for_new().await;
        store.check_for_new().await;
        assert_eq!(store.stats().await.unread_count, 1);
        assert!(notifier.toasts().is_empty());
    }

    #[tokio::test]
    async fn count_failure_keeps_previous_stats() {
        let (store, api, _notifier) = store_with(vec![], &[3]);
        store.check_for_new().await;
        api.counts
            .lock()
            .unwrap()
            .push_back(Err(ApiError::network(NetworkFailure::Timeout)));
        store.check_for_new().await;
        assert_eq!(store.stats().await.unread_count, 3);
    }

    #[tokio::test]
    async fn mark_as_read_is_optimistic() {
        let list = vec![
            notification(1, NotificationStatus::Unread, "a"),
            notification(2, NotificationStatus::Unread, "b"),
            notification(3, NotificationStatus::Unread, "c"),
        ];
        let (store, api, notifier) = store_with(list, &[3]);
        store.fetch_all().await;

        assert!(store.mark_as_read(&NotificationId::Int(2)).await);

        let snap = store.snapshot().await;
        assert_eq!(snap.stats.unread_count, 2);
        assert_eq!(snap.notifications[1].status, NotificationStatus::Read);
        assert_eq!(snap.notifications[0].status, NotificationStatus::Unread);
        assert!(api.calls().contains(&"mark_as_read:2".to_string()));
        assert!(notifier.errors().is_empty());
    }

    #[tokio::test]
    async fn mark_as_read_failure_keeps_optimistic_state() {
        let list = vec![
            notification(1, NotificationStatus::Unread, "a"),
            notification(2, NotificationStatus::Unread, "b"),
            notification(3, NotificationStatus::Unread, "c"),
        ];
        let (store, api, notifier) = store_with(list, &[3]);
        store.fetch_all().await;
        api.fail_mutations_with(ApiError::from_response(
            500,
            None,
            &serde_json::json!({}),
        ));

        assert!(!store.mark_as_read(&NotificationId::Int(1)).await);

        let snap = store.snapshot().await;
        assert_eq!(snap.stats.unread_count, 2);
        assert_eq!(snap.notifications[0].status, NotificationStatus::Read);
        assert_eq!(notifier.errors(), vec![crate::api_error::MSG_SERVER_ERROR]);
    }

    #[tokio::test]
    async fn mark_as_read_does_not_downgrade_replied() {
        let list = vec![notification(1, NotificationStatus::Replied, "a")];
        let (store, _api, _notifier) = store_with(list, &[1]);
        store.fetch_all().await;

        assert!(store.mark_as_read(&NotificationId::Int(1)).await);

        let snap = store.snapshot().await;
        assert_eq!(snap.notifications[0].status, NotificationStatus::Replied);
        assert_eq!(snap.stats.unread_count, 0);
    }

    #[tokio::test]
    async fn mark_as_read_of_toasted_id_outside_list_still_decrements() {
        let list = vec![notification(1, NotificationStatus::Unread, "a")];
        let (store, api, _notifier) = store_with(list.clone(), &[3]);
        store.fetch_all().await;

        assert!(store.mark_as_read(&NotificationId::Int(9)).await);

        let snap = store.snapshot().await;
        assert_eq!(snap.stats.unread_count, 2);
        assert_eq!(snap.notifications, list);
        assert!(api.calls().contains(&"mark_as_read:9".to_string()));
    }

    #[tokio::test]
    async fn mark_as_read_clamps_counter_at_zero() {
        let (store, _api, _notifier) = store_with(vec![], &[0]);
        store.fetch_all().await;
        assert!(store.mark_as_read(&NotificationId::Int(1)).await);
        assert!(store.mark_as_read(&NotificationId::Int(2)).await);
        assert_eq!(store.stats().await.unread_count, 0);
    }

    #[tokio::test]
    async fn check_for_new_leaves_last_checked_to_fetch_all() {
        let (store, _api, _notifier) = store_with(vec![], &[2]);
        store.check_for_new().await;
        assert_eq!(store.stats().await.unread_count, 2);
        assert!(store.last_checked().await.is_none());
    }

    #[tokio::test]
    async fn mark_all_as_read_is_idempotent() {
        let list = vec![
            notification(1, NotificationStatus::Unread, "a"),
            notification(2, NotificationStatus::Replied, "b"),
        ];
        let (store, _api, notifier) = store_with(list, &[1]);
        store.fetch_all().await;

        assert!(store.mark_all_as_read().await);
        assert_eq!(store.stats().await.unread_count, 0);
        assert!(store.mark_all_as_read().await);
        assert_eq!(store.stats().await.unread_count, 0);

        let snap = store.snapshot().await;
        assert_eq!(snap.notifications[0].status, NotificationStatus::Read);
        assert_eq!(snap.notifications[1].status, NotificationStatus::Replied);
        assert!(store.unread().await.is_empty());
        assert!(notifier.errors().is_empty());
    }

    #[tokio::test]
    async fn mark_all_failure_reports_but_keeps_zero() {
        let list = vec![notification(1, NotificationStatus::Unread, "a")];
        let (store, api, notifier) = store_with(list, &[1]);
        store.fetch_all().await;
        api.fail_mutations_with(ApiError::network(NetworkFailure::Unreachable));

        assert!(!store.mark_all_as_read().await);
        assert_eq!(store.stats().await.unread_count, 0);
        assert_eq!(notifier.errors().len(), 1);
    }

    #[tokio::test]
    async fn reply_success_records_reply_locally() {
        let list = vec![notification(1, NotificationStatus::Read, "a")];
        let (store, api, notifier) = store_with(list, &[0]);
        store.fetch_all().await;

        assert!(store.reply_to_notification(&NotificationId::Int(1), "thanks!").await);

        let snap = store.snapshot().await;
        let n = &snap.notifications[0];
        assert_eq!(n.status, NotificationStatus::Replied);
        assert_eq!(n.sent_reply.as_deref(), Some("thanks!"));
        assert!(n.sent_timestamp.is_some());
        assert_eq!(snap.stats.unread_count, 0);
        assert!(api.calls().contains(&"reply:1:thanks!".to_string()));
        assert_eq!(notifier.successes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reply_failure_leaves_state_unchanged() {
        let original = notification(1, NotificationStatus::Unread, "a");
        let (store, api, notifier) = store_with(vec![original.clone()], &[1]);
        store.fetch_all().await;
        api.fail_mutations_with(ApiError::from_response(
            400,
            None,
            &serde_json::json!({"message": ["Instance disconnected"]}),
        ));

        assert!(!store.reply_to_notification(&NotificationId::Int(1), "hi").await);

        let snap = store.snapshot().await;
        assert_eq!(snap.notifications, vec![original]);
        assert_eq!(snap.stats.unread_count, 1);
        assert_eq!(notifier.errors(), vec!["Instance disconnected".to_string()]);
    }

    #[tokio::test]
    async fn blank_reply_is_rejected_locally() {
        let (store, api, notifier) = store_with(vec![], &[]);
        assert!(!store.reply_to_notification(&NotificationId::Int(1), "   ").await);
        assert!(api.calls().is_empty());
        assert_eq!(notifier.errors().len(), 1);
    }

    #[tokio::test]
    async fn poll_reconciles_optimistic_state() {
        let list = vec![notification(1, NotificationStatus::Unread, "a")];
        let (store, api, _notifier) = store_with(list.clone(), &[1]);
        store.fetch_all().await;
        api.fail_mutations_with(ApiError::network(NetworkFailure::Unreachable));
        store.mark_as_read(&NotificationId::Int(1)).await;
        assert_eq!(store.stats().await.unread_count, 0);

        api.push_count(1);
        store.fetch_all().await;

        let snap = store.snapshot().await;
        assert_eq!(snap.notifications, list);
        assert_eq!(snap.stats.unread_count, 1);
    }
}
