//! Interval polling scoped to an explicit handle.
//!
//! A poller runs only while its [`PollingHandle`] is alive. `stop()` cancels
//! and joins the task; dropping the handle cancels it as well.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::store::NotificationStore;

pub const STORE_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const BADGE_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub struct PollingHandle {
    name: &'static str,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PollingHandle {
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the poller and wait for its task to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(h) = self.handle.take() {
            if let Err(e) = h.await {
                if !e.is_cancelled() {
                    tracing::warn!(poller = self.name, error = %e, "poller task failed");
                }
            }
        }
        tracing::debug!(poller = self.name, "poller stopped");
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Run `initial` once, then `tick` every `period` until cancelled.
///
/// Cancellation is observed between runs and while a run is awaiting.
pub fn spawn_poller<I, IF, T, TF>(
    name: &'static str,
    period: Duration,
    initial: I,
    mut tick: T,
) -> PollingHandle
where
    I: FnOnce() -> IF + Send + 'static,
    IF: Future<Output = ()> + Send + 'static,
    T: FnMut() -> TF + Send + 'static,
    TF: Future<Output = ()> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let tok = cancel.clone();
    let handle = tokio::spawn(async move {
        tokio::select! {
          _ = tok.cancelled() => return,
          _ = initial() => {}
        }

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
              _ = tok.cancelled() => break,
              _ = ticker.tick() => {
                tokio::select! {
                  _ = tok.cancelled() => break,
                  _ = tick() => {}
                }
              }
            }
        }
    });

    tracing::debug!(poller = name, ?period, "poller started");
    PollingHandle {
        name,
        cancel,
        handle: Some(handle),
    }
}

impl NotificationStore {
    /// Fetch everything once, then check for new notifications every `period`.
    pub fn start_polling(self: &Arc<Self>, period: Duration) -> PollingHandle {
        let first = Arc::clone(self);
        let store = Arc::clone(self);
        spawn_poller(
            "notifications",
            period,
            move || async move { first.fetch_all().await },
            move || {
                let store = Arc::clone(&store);
                async move { store.check_for_new().await }
            },
        )
    }
}
