use std::{env, fs, io, path::Path, str::FromStr, time::Duration};

use crate::{
    errors::Error,
    polling::{BADGE_POLL_INTERVAL, STORE_POLL_INTERVAL},
    retry::DEFAULT_MAX_RETRIES,
    toast::{ToastStyle, DEFAULT_NOTIFICATIONS_ROUTE, DEFAULT_PREVIEW_LEN},
    Result,
};

/// Which poller the watcher runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchMode {
    /// Full store: list + toasts.
    Full,
    /// Unread counter only.
    Badge,
}

impl FromStr for WatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(WatchMode::Full),
            "badge" => Ok(WatchMode::Badge),
            other => Err(Error::Config(format!(
                "WATCH_MODE must be `full` or `badge`, got `{other}`"
            ))),
        }
    }
}

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Backend
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub tenant_id: Option<String>,
    pub request_timeout: Duration,

    // Polling
    pub poll_interval: Duration,
    pub badge_poll_interval: Duration,
    pub watch_mode: WatchMode,

    // Retries (read path only, opt-in)
    pub retry_reads: bool,
    pub max_retries: u32,

    // Toasts
    pub toast_preview_len: usize,
    pub notifications_route: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"))?;
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Build from an arbitrary key lookup (tests use a map instead of the process env).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base_url = get("INBOX_API_URL")
            .and_then(non_empty)
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .ok_or_else(|| {
                Error::Config("INBOX_API_URL environment variable is required".to_string())
            })?;
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "INBOX_API_URL must be an http(s) URL, got `{api_base_url}`"
            )));
        }

        let api_token = get("INBOX_API_TOKEN").and_then(non_empty);
        let tenant_id = get("INBOX_TENANT_ID").and_then(non_empty);
        let request_timeout =
            Duration::from_millis(parse_num(&get, "REQUEST_TIMEOUT_MS").unwrap_or(10_000));

        let poll_interval = parse_num(&get, "POLL_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(STORE_POLL_INTERVAL);
        let badge_poll_interval = parse_num(&get, "BADGE_POLL_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(BADGE_POLL_INTERVAL);
        if poll_interval.is_zero() || badge_poll_interval.is_zero() {
            return Err(Error::Config("poll intervals must be non-zero".to_string()));
        }

        let watch_mode = match get("WATCH_MODE").and_then(non_empty) {
            Some(v) => v.parse()?,
            None => WatchMode::Full,
        };

        let retry_reads = parse_bool(&get, "RETRY_READS").unwrap_or(false);
        let max_retries = parse_num(&get, "MAX_RETRIES").unwrap_or(DEFAULT_MAX_RETRIES);

        let toast_preview_len = parse_num(&get, "TOAST_PREVIEW_LEN").unwrap_or(DEFAULT_PREVIEW_LEN);
        let notifications_route = get("NOTIFICATIONS_ROUTE")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_NOTIFICATIONS_ROUTE.to_string());

        Ok(Self {
            api_base_url,
            api_token,
            tenant_id,
            request_timeout,
            poll_interval,
            badge_poll_interval,
            watch_mode,
            retry_reads,
            max_retries,
            toast_preview_len,
            notifications_route,
        })
    }

    pub fn toast_style(&self) -> ToastStyle {
        ToastStyle {
            preview_len: self.toast_preview_len,
            route: self.notifications_route.clone(),
        }
    }
}

/// A missing file is fine; an unreadable one is an error.
fn load_dotenv_if_present(path: &Path) -> Result<()> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for raw in contents.lines() {
        let Some((key, val)) = parse_dotenv_line(raw) else {
            continue;
        };
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
    Ok(())
}

fn parse_dotenv_line(raw: &str) -> Option<(String, String)> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (k, v) = line.split_once('=')?;
    let key = k.trim();
    if key.is_empty() {
        return None;
    }

    let mut val = v.trim();
    // Strip optional surrounding quotes.
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        val = &val[1..val.len() - 1];
    }
    Some((key.to_string(), val.to_string()))
}

fn parse_num<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    get(key).and_then(|s| s.trim().parse::<T>().ok())
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    get(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
