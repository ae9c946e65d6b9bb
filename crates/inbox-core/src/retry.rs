//! Exponential-backoff retry around a fallible async operation.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::sleep;

use crate::{
    api_error::ApiError,
    domain::{Notification, NotificationId, NotificationStats},
    errors::Error,
    ports::NotificationApi,
};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Errors that know whether another attempt is worthwhile and how long to wait.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
    fn retry_delay(&self, attempt: u32) -> Duration;
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        ApiError::is_retryable(self)
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        ApiError::retry_delay(self, attempt)
    }
}

impl Retryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Api(e) => e.is_retryable(),
            _ => false,
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        match self {
            Error::Api(e) => e.retry_delay(attempt),
            _ => crate::api_error::backoff_delay(attempt),
        }
    }
}

type OnRetry<'a, E> = Box<dyn FnMut(u32, &E) + Send + 'a>;

/// Retry builder.
///
/// `max_retries` is the total number of attempts; values below 1 are treated as 1.
pub struct Retry<'a, E> {
    max_retries: u32,
    on_retry: Option<OnRetry<'a, E>>,
}

impl<E> Default for Retry<'_, E> {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            on_retry: None,
        }
    }
}

impl<'a, E: Retryable> Retry<'a, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Called with the 1-based number of the attempt that just failed.
    pub fn on_retry(mut self, cb: impl FnMut(u32, &E) + Send + 'a) -> Self {
        self.on_retry = Some(Box::new(cb));
        self
    }

    pub async fn run<T, Op, Fut>(mut self, mut op: Op) -> std::result::Result<T, E>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let attempts = self.max_retries.max(1);
        let mut attempt = 0u32;
        loop {
            let err = match op().await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };

            if !err.is_retryable() || attempt + 1 >= attempts {
                return Err(err);
            }

            if let Some(cb) = self.on_retry.as_mut() {
                cb(attempt + 1, &err);
            }
            let delay = err.retry_delay(attempt);
            tracing::debug!(attempt = attempt + 1, ?delay, "retrying after failure");
            sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Shorthand for `Retry::new().run(op)` with the default attempt budget.
pub async fn with_retry<T, E, Op, Fut>(op: Op) -> std::result::Result<T, E>
where
    E: Retryable,
    Op: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    Retry::new().run(op).await
}

/// NotificationApi decorator that retries read-path calls.
///
/// Mutations pass straight through: a reply is not idempotent.
pub struct RetryingApi {
    inner: Arc<dyn NotificationApi>,
    max_retries: u32,
}

impl RetryingApi {
    pub fn new(inner: Arc<dyn NotificationApi>, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }

    fn log_retry(op: &'static str) -> impl FnMut(u32, &ApiError) + Send {
        move |attempt, err| tracing::warn!(op, attempt, error = %err, "read failed, retrying")
    }
}

#[async_trait]
impl NotificationApi for RetryingApi {
    async fn list(&self, limit: Option<usize>) -> std::result::Result<Vec<Notification>, ApiError> {
        Retry::new()
            .max_retries(self.max_retries)
            .on_retry(Self::log_retry("list"))
            .run(|| self.inner.list(limit))
            .await
    }

    async fn unread_count(&self) -> std::result::Result<NotificationStats, ApiError> {
        Retry::new()
            .max_retries(self.max_retries)
            .on_retry(Self::log_retry("unread_count"))
            .run(|| self.inner.unread_count())
            .await
    }

    async fn mark_as_read(&self, id: &NotificationId) -> std::result::Result<(), ApiError> {
        self.inner.mark_as_read(id).await
    }

    async fn mark_all_as_read(&self) -> std::result::Result<(), ApiError> {
        self.inner.mark_all_as_read().await
    }

    async fn reply(
        &self,
        id: &NotificationId,
        message: &str,
    ) -> std::result::Result<(), ApiError> {
        self.inner.reply(id, message).await
    }
}
