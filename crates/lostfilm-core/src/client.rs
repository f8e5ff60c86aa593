//! HTTP client with rate limiting for LostFilm.TV
//!
//! This module wraps reqwest with the settings the tracker is constructed
//! with (timeouts, proxies, TLS verification) and exposes the handful of
//! request shapes the login flow and the catalog parser need. Responses are
//! returned as [`UpstreamResponse`] so callers can inspect statuses,
//! redirects and cookies themselves.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE, LOCATION, REFERER};
use reqwest::redirect::Policy;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::{Result, TrackerError};
use crate::types::UpstreamResponse;

/// Root of the catalog site
pub const LOSTFILM_BASE_URL: &str = "https://www.lostfilm.tv";

/// Cross-domain authentication endpoint
pub const LOSTFILM_LOGIN_URL: &str =
    "https://login1.bogi.ru/login.php?referer=https%3A%2F%2Fwww.lostfilm.tv%2F";

/// Settings page that exposes the session token
const DEFAULT_PROFILE_PATH: &str = "/my.php";

/// Default User-Agent mimicking a modern browser
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// The catalog is Russian-language
const DEFAULT_ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en;q=0.8";

/// Base delay for exponential backoff (in milliseconds)
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Rate limiter to control request frequency
///
/// Ensures that requests are spaced at least `min_interval` apart.
pub struct RateLimiter {
    /// Minimum interval between requests
    min_interval: Duration,
    /// Timestamp of the last request
    last_request: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    ///
    /// A rate that does not map to a representable interval disables throttling.
    ///
    /// # Example
    /// ```
    /// use lostfilm_core::client::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(2.0); // 2 requests per second
    /// ```
    pub fn new(requests_per_second: f64) -> Self {
        Self::with_min_interval(
            min_interval_for(requests_per_second).unwrap_or(Duration::ZERO),
        )
    }

    /// Create a rate limiter spacing requests `min_interval` apart
    pub fn with_min_interval(min_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(now.checked_sub(min_interval).unwrap_or(now))),
        }
    }

    /// Wait until the minimum interval since the last request has passed.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();

        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }

        *last = Instant::now();
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Construction-time settings of the tracker transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Catalog site root
    pub base_url: String,
    /// Authentication endpoint (on a different host)
    pub login_url: String,
    /// Path of the settings page on the catalog site
    pub profile_path: String,
    /// Per-request deadline in seconds, `None` disables it
    pub request_timeout_secs: Option<u64>,
    /// Outbound proxies keyed by `http`, `https` or `all`
    pub proxies: HashMap<String, String>,
    /// Validate TLS certificates
    pub verify: bool,
    /// Maximum requests per second (default: 2.0)
    pub requests_per_second: f64,
    /// Retries of catalog GETs on 429/5xx (default: 3)
    pub max_retries: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            base_url: LOSTFILM_BASE_URL.to_string(),
            login_url: LOSTFILM_LOGIN_URL.to_string(),
            profile_path: DEFAULT_PROFILE_PATH.to_string(),
            request_timeout_secs: Some(30),
            proxies: HashMap::new(),
            verify: true,
            requests_per_second: 2.0,
            max_retries: 3,
        }
    }
}

/// HTTP client for LostFilm.TV
///
/// Holds two reqwest clients built from the same settings: one follows
/// redirects (the cross-domain login POST), the other does not so that
/// 3xx answers stay visible to the caller.
pub struct TrackerClient {
    client: reqwest::Client,
    direct: reqwest::Client,
    rate_limiter: RateLimiter,
    base_url: Url,
    login_url: Url,
    profile_path: String,
    max_retries: u32,
}

impl TrackerClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(TrackerSettings::default())
    }

    /// Create a new client from the given settings
    ///
    /// # Errors
    /// - `TrackerError::InvalidUrl` - a URL in the settings is invalid
    /// - `TrackerError::InvalidSettings` - bad request rate or proxy scheme
    /// - `TrackerError::HttpError` - reqwest refused the client configuration
    pub fn with_config(settings: TrackerSettings) -> Result<Self> {
        let min_interval = min_interval_for(settings.requests_per_second).ok_or_else(|| {
            TrackerError::InvalidSettings(format!(
                "requests_per_second out of range: {}",
                settings.requests_per_second
            ))
        })?;

        let base_url = parse_setting_url(&settings.base_url)?;
        let login_url = parse_setting_url(&settings.login_url)?;

        let client = build_http_client(&settings, Policy::default())?;
        let direct = build_http_client(&settings, Policy::none())?;

        Ok(Self {
            client,
            direct,
            rate_limiter: RateLimiter::with_min_interval(min_interval),
            base_url,
            login_url,
            profile_path: settings.profile_path,
            max_retries: settings.max_retries,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// Resolve a site path (or absolute URL) against the catalog root.
    pub fn catalog_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| TrackerError::InvalidUrl(format!("{}: {}", path, e)))
    }

    pub fn profile_url(&self) -> Result<Url> {
        self.catalog_url(&self.profile_path)
    }

    /// Whether `url` points at the catalog site.
    ///
    /// The scheme is ignored (explicit ports must still match) and a leading
    /// `www.` is optional.
    pub fn is_catalog_host(&self, url: &Url) -> bool {
        same_site(&self.base_url, url)
    }

    /// Single GET without following redirects.
    pub async fn get(&self, url: &Url, cookies: &[(&str, &str)]) -> Result<UpstreamResponse> {
        self.rate_limiter.acquire().await;
        tracing::debug!(url = %url, "GET");

        let mut request = self.direct.get(url.clone());
        if !cookies.is_empty() {
            request = request.header(COOKIE, cookie_header(cookies));
        }
        let response = request.send().await?;
        into_upstream(response).await
    }

    /// GET that retries 429 and 5xx answers with exponential backoff.
    ///
    /// The last response is returned as-is once retries are exhausted.
    pub async fn get_with_retry(
        &self,
        url: &Url,
        cookies: &[(&str, &str)],
    ) -> Result<UpstreamResponse> {
        let mut attempt = 0;
        loop {
            let response = self.get(url, cookies).await?;
            let retryable = response.status == 429 || (500..600).contains(&response.status);
            if !retryable || attempt >= self.max_retries {
                return Ok(response);
            }

            let delay = calculate_backoff_delay(attempt);
            tracing::debug!(url = %url, status = response.status, attempt, "retrying after {:?}", delay);
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Fetch a page body, turning unusable statuses into errors.
    ///
    /// # Errors
    /// - `TrackerError::NotFound` - server returned 404
    /// - `TrackerError::RateLimited` - server returned 429 after all retries
    /// - `TrackerError::UnexpectedStatus` - any other non-200 answer
    pub async fn fetch(&self, url: &Url, cookies: &[(&str, &str)]) -> Result<String> {
        let response = self.get_with_retry(url, cookies).await?;
        match response.status {
            200 => Ok(response.body),
            404 => Err(TrackerError::NotFound(url.to_string())),
            429 => Err(TrackerError::RateLimited),
            status => Err(TrackerError::UnexpectedStatus {
                status,
                url: url.to_string(),
            }),
        }
    }

    /// POST an urlencoded form. Never retried.
    pub async fn post_form(
        &self,
        url: &Url,
        form: &[(String, String)],
        referer: Option<&str>,
        follow_redirects: bool,
    ) -> Result<UpstreamResponse> {
        self.rate_limiter.acquire().await;
        tracing::debug!(url = %url, follow_redirects, "POST");

        let http = if follow_redirects { &self.client } else { &self.direct };
        let mut request = http.post(url.clone()).form(form);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        let response = request.send().await?;
        into_upstream(response).await
    }

    #[cfg(test)]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

/// Interval between requests for a positive, finite rate.
fn min_interval_for(requests_per_second: f64) -> Option<Duration> {
    if !(requests_per_second > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / requests_per_second).ok()
}

fn parse_setting_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| TrackerError::InvalidUrl(format!("{}: {}", raw, e)))
}

fn build_http_client(settings: &TrackerSettings, policy: Policy) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
    );

    let mut builder = reqwest::Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .default_headers(headers)
        .redirect(policy)
        .danger_accept_invalid_certs(!settings.verify);

    if let Some(secs) = settings.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    for (scheme, proxy_url) in &settings.proxies {
        let proxy = match scheme.as_str() {
            "http" => reqwest::Proxy::http(proxy_url.as_str())?,
            "https" => reqwest::Proxy::https(proxy_url.as_str())?,
            "all" => reqwest::Proxy::all(proxy_url.as_str())?,
            other => {
                return Err(TrackerError::InvalidSettings(format!(
                    "unsupported proxy scheme: {}",
                    other
                )))
            }
        };
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

async fn into_upstream(response: reqwest::Response) -> Result<UpstreamResponse> {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let cookies = response
        .cookies()
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect();
    let body = response.text().await?;

    tracing::debug!(url = %url, status, "response received");

    Ok(UpstreamResponse {
        status,
        url,
        location,
        cookies,
        body,
    })
}

fn cookie_header(cookies: &[(&str, &str)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

pub(crate) fn same_site(a: &Url, b: &Url) -> bool {
    fn bare_host(url: &Url) -> Option<String> {
        url.host_str()
            .map(|h| h.trim_start_matches("www.").to_lowercase())
    }

    bare_host(a).is_some()
        && bare_host(a) == bare_host(b)
        && a.port() == b.port()
}

/// Exponential backoff: 1s, 2s, 4s, ... saturating at `u64::MAX` ms
fn calculate_backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BASE_RETRY_DELAY_MS.saturating_mul(2u64.saturating_pow(attempt)))
}
