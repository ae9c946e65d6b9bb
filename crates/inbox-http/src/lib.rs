//! REST adapter (reqwest) for the notifications backend.
//!
//! Implements the `inbox-core` NotificationApi port. Every non-2xx response or
//! transport failure is decoded into `ApiError` here and nowhere else.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use inbox_core::{
    api_error::NetworkFailure,
    config::Config,
    domain::{Notification, NotificationId, NotificationStats},
    errors::Error,
    ports::NotificationApi,
    ApiError, Result,
};

const TENANT_HEADER: &str = "X-Tenant-ID";

/// List endpoint payload: either a bare array or a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListPayload {
    Page { results: Vec<Notification> },
    Bare(Vec<Notification>),
}

impl ListPayload {
    fn into_vec(self) -> Vec<Notification> {
        match self {
            ListPayload::Page { results } => results,
            ListPayload::Bare(v) => v,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkReadBody<'a> {
    notification_id: &'a NotificationId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyBody<'a> {
    notification_id: &'a NotificationId,
    message: &'a str,
}

#[derive(Clone, Debug)]
pub struct HttpNotificationApi {
    base_url: String,
    token: Option<String>,
    tenant_id: Option<String>,
    http: reqwest::Client,
}

impl HttpNotificationApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("inbox-http/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            tenant_id: None,
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut api = Self::new(cfg.api_base_url.clone(), cfg.request_timeout)?;
        api.token = cfg.api_token.clone();
        api.tenant_id = cfg.tenant_id.clone();
        Ok(api)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/notifications/{path}", self.base_url)
    }

    fn authorize(&self, mut req: RequestBuilder) -> RequestBuilder {
        req = req.header(header::ACCEPT, "application/json");
        if let Some(t) = &self.token {
            req = req.bearer_auth(t);
        }
        if let Some(tenant) = &self.tenant_id {
            req = req.header(TENANT_HEADER, tenant);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> std::result::Result<Response, ApiError> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(map_transport_error)?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        Err(decode_error_response(resp).await)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> std::result::Result<T, ApiError> {
        let resp = self.send(req).await?;
        resp.json::<T>().await.map_err(|e| {
            ApiError::network(NetworkFailure::Other(format!("invalid response body: {e}")))
        })
    }
}

fn map_transport_error(e: reqwest::Error) -> ApiError {
    let failure = if e.is_timeout() {
        NetworkFailure::Timeout
    } else if e.is_connect() {
        NetworkFailure::Unreachable
    } else {
        NetworkFailure::Other(e.to_string())
    };
    ApiError::network(failure)
}

async fn decode_error_response(resp: Response) -> ApiError {
    let status = resp.status().as_u16();
    let retry_after = resp
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let text = resp.text().await.unwrap_or_default();
    let err = ApiError::from_response(status, retry_after.as_deref(), &parse_error_body(&text));
    tracing::debug!(status, error = %err, "api request failed");
    err
}

/// JSON body if it parses, otherwise the raw text as a string body.
fn parse_error_body(text: &str) -> serde_json::Value {
    if text.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn list(&self, limit: Option<usize>) -> std::result::Result<Vec<Notification>, ApiError> {
        let mut req = self.http.get(self.url(""));
        if let Some(n) = limit {
            req = req.query(&[("limit", n)]);
        }
        let payload: ListPayload = self.get_json(req).await?;
        Ok(payload.into_vec())
    }

    async fn unread_count(&self) -> std::result::Result<NotificationStats, ApiError> {
        self.get_json(self.http.get(self.url("unread-count/"))).await
    }

    async fn mark_as_read(&self, id: &NotificationId) -> std::result::Result<(), ApiError> {
        let body = MarkReadBody {
            notification_id: id,
        };
        self.send(self.http.post(self.url("mark-as-read/")).json(&body))
            .await?;
        Ok(())
    }

    async fn mark_all_as_read(&self) -> std::result::Result<(), ApiError> {
        self.send(self.http.post(self.url("mark-all-as-read/")))
            .await?;
        Ok(())
    }

    async fn reply(
        &self,
        id: &NotificationId,
        message: &str,
    ) -> std::result::Result<(), ApiError> {
        let body = ReplyBody {
            notification_id: id,
            message,
        };
        self.send(self.http.post(self.url("reply/")).json(&body))
            .await?;
        Ok(())
    }
}
