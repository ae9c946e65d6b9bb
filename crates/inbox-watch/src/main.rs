use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;

use inbox_core::{
    badge::UnreadBadge,
    config::{Config, WatchMode},
    ports::{NotificationApi, Notifier},
    retry::RetryingApi,
    store::NotificationStore,
    toast::{Toast, ToastAction},
};
use inbox_http::HttpNotificationApi;

/// Prints toasts and notices to the terminal.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn toast(&self, toast: Toast) {
        let ToastAction::Navigate { label, route } = &toast.action;
        println!(
            "🔔 {} · {}\n   {}\n   [{label}] {route}",
            toast.contact_name, toast.campaign_name, toast.preview
        );
    }

    fn error(&self, message: &str) {
        eprintln!("❌ {message}");
    }

    fn success(&self, message: &str) {
        println!("✅ {message}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    inbox_core::logging::init("inbox-watch")?;

    let cfg = Config::load().context("loading configuration")?;

    let http = HttpNotificationApi::from_config(&cfg).context("building http client")?;
    let api: Arc<dyn NotificationApi> = if cfg.retry_reads {
        Arc::new(RetryingApi::new(Arc::new(http), cfg.max_retries))
    } else {
        Arc::new(http)
    };

    tracing::info!(
        url = %cfg.api_base_url,
        mode = ?cfg.watch_mode,
        "inbox-watch starting"
    );

    match cfg.watch_mode {
        WatchMode::Full => {
            let store = Arc::new(NotificationStore::with_toast_style(
                api,
                Arc::new(ConsoleNotifier),
                cfg.toast_style(),
            ));
            let poller = store.start_polling(cfg.poll_interval);
            tokio::signal::ctrl_c()
                .await
                .context("waiting for ctrl-c")?;
            poller.stop().await;

            let stats = store.stats().await;
            tracing::info!(unread = stats.unread_count, "inbox-watch stopped");
        }
        WatchMode::Badge => {
            let badge = Arc::new(UnreadBadge::new(api));
            let mut rx = badge.subscribe();
            let poller = badge.start_polling(cfg.badge_poll_interval);
            loop {
                tokio::select! {
                  res = tokio::signal::ctrl_c() => {
                    res.context("waiting for ctrl-c")?;
                    break;
                  }
                  changed = rx.changed() => {
                    if changed.is_err() {
                      break;
                    }
                    print_badge(&rx);
                  }
                }
            }
            poller.stop().await;
            tracing::info!(unread = badge.unread_count(), "inbox-watch stopped");
        }
    }

    Ok(())
}

fn print_badge(rx: &watch::Receiver<inbox_core::domain::NotificationStats>) {
    let count = rx.borrow().unread_count;
    println!("📬 {count} unread");
}
