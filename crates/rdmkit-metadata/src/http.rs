use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{MetadataError, Result};

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

/// Budget assumed until a server advertises its own.
pub const HOURLY_BUDGET: u32 = 5000;

/// Remaining/limit ratio at or below which the next call waits for the reset.
pub const RESET_RATIO: f64 = 0.1;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRIES: u32 = 3;

// ─── RateGovernor ─────────────────────────────────────────────────────────────

/// What the governor wants done before the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// Minimum spacing between calls.
    SpeedBump(Duration),
    /// The budget is nearly spent; sleep until the advertised reset.
    UntilReset(Duration),
}

impl Pause {
    pub fn duration(&self) -> Duration {
        match self {
            Pause::SpeedBump(d) | Pause::UntilReset(d) => *d,
        }
    }
}

/// Throttle state for one endpoint origin, fed from `X-RateLimit-*` headers.
#[derive(Debug, Clone, Default)]
pub struct RateGovernor {
    limit: Option<u32>,
    remaining: Option<u32>,
    reset: Option<i64>,
    fixed_interval: Option<Duration>,
}

impl RateGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Governor whose speed bump is pinned regardless of advertised limits.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            fixed_interval: Some(interval),
            ..Self::default()
        }
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn reset(&self) -> Option<i64> {
        self.reset
    }

    pub fn observe(&mut self, limit: Option<u32>, remaining: Option<u32>, reset: Option<i64>) {
        if let Some(l) = limit.filter(|l| *l > 0) {
            self.limit = Some(l);
        }
        if remaining.is_some() {
            self.remaining = remaining;
        }
        if reset.is_some() {
            self.reset = reset;
        }
    }

    /// Record whatever rate-limit headers a response carried. Unparseable values are ignored.
    pub fn observe_headers(&mut self, headers: &HeaderMap) {
        fn number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<T>().ok())
        }
        self.observe(
            number(headers, HEADER_LIMIT),
            number(headers, HEADER_REMAINING),
            number(headers, HEADER_RESET),
        );
    }

    pub fn speed_bump(&self) -> Duration {
        if let Some(interval) = self.fixed_interval {
            return interval;
        }
        let limit = self.limit.unwrap_or(HOURLY_BUDGET);
        if limit >= HOURLY_BUDGET {
            Duration::from_secs(3600) / HOURLY_BUDGET
        } else {
            Duration::from_secs(60) / limit
        }
    }

    pub fn remaining_ratio(&self) -> Option<f64> {
        match (self.limit, self.remaining) {
            (Some(limit), Some(remaining)) if limit > 0 => Some(f64::from(remaining) / f64::from(limit)),
            _ => None,
        }
    }

    /// Time left until the advertised reset, if the budget calls for waiting on it.
    pub fn reset_wait(&self, now: i64) -> Option<Duration> {
        let ratio = self.remaining_ratio()?;
        let reset = self.reset?;
        if ratio > RESET_RATIO || reset <= now {
            return None;
        }
        u64::try_from(reset - now).ok().map(Duration::from_secs)
    }

    /// The sleep owed before the next call, `now` being Unix seconds.
    pub fn pause(&self, now: i64) -> Pause {
        match self.reset_wait(now) {
            Some(wait) => Pause::UntilReset(wait),
            None => Pause::SpeedBump(self.speed_bump()),
        }
    }

    /// After a 429: wait for the reset when known, else for `retry_after`, else one minute.
    pub fn backoff_after_429(&self, now: i64, retry_after: Option<u64>) -> Duration {
        if let Some(reset) = self.reset.filter(|r| *r > now) {
            return Duration::from_secs((reset - now) as u64);
        }
        Duration::from_secs(retry_after.unwrap_or(60))
    }
}

fn resume_time(wait: Duration) -> String {
    let at = Utc::now().timestamp() + wait.as_secs() as i64;
    Utc.timestamp_opt(at, 0)
        .single()
        .map(|t| t.format("%H:%M:%S UTC").to_string())
        .unwrap_or_default()
}

// ─── GovernedClient ───────────────────────────────────────────────────────────

/// Body and headers of a successful response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Debug, Default)]
struct OriginState {
    governor: RateGovernor,
    last_request: Option<Instant>,
}

/// reqwest client with per-origin rate-limit governors, a request deadline and a retry budget.
///
/// Calls are expected to be issued one at a time; the origin table is locked for the
/// duration of the pre-call wait.
#[derive(Clone)]
pub struct GovernedClient {
    client: reqwest::Client,
    origins: Arc<Mutex<HashMap<String, OriginState>>>,
    template: RateGovernor,
    max_retries: u32,
    token: Option<String>,
}

impl GovernedClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        Self::with_options(user_agent, DEFAULT_TIMEOUT, DEFAULT_RETRIES)
    }

    pub fn with_options(user_agent: &str, timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            origins: Arc::new(Mutex::new(HashMap::new())),
            template: RateGovernor::new(),
            max_retries,
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    /// Governor copied into each newly seen origin.
    pub fn with_governor(mut self, governor: RateGovernor) -> Self {
        self.template = governor;
        self
    }

    /// Snapshot of the governor for `url`'s origin.
    pub async fn governor_for(&self, url: &str) -> RateGovernor {
        let origins = self.origins.lock().await;
        origins
            .get(&origin_of(url))
            .map(|s| s.governor.clone())
            .unwrap_or_else(|| self.template.clone())
    }

    async fn before_call(&self, origin: &str) {
        let mut origins = self.origins.lock().await;
        let state = origins.entry(origin.to_string()).or_insert_with(|| OriginState {
            governor: self.template.clone(),
            last_request: None,
        });
        match state.governor.pause(Utc::now().timestamp()) {
            Pause::UntilReset(wait) => {
                info!(origin, wait_secs = wait.as_secs(), resume = %resume_time(wait), "rate limit nearly spent, waiting for reset");
                sleep(wait).await;
            }
            Pause::SpeedBump(bump) => {
                if let Some(t) = state.last_request {
                    let elapsed = t.elapsed();
                    if elapsed < bump {
                        sleep(bump - elapsed).await;
                    }
                }
            }
        }
        state.last_request = Some(Instant::now());
    }

    async fn observe(&self, origin: &str, headers: &HeaderMap) -> RateGovernor {
        let mut origins = self.origins.lock().await;
        let state = origins.entry(origin.to_string()).or_default();
        state.governor.observe_headers(headers);
        state.governor.clone()
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        Ok(self.get_response(url, None).await?.body)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.get_response(url, Some("application/json")).await?;
        serde_json::from_str(&resp.body).map_err(|e| MetadataError::Parse(format!("{url}: {e}")))
    }

    /// GET `url`, governed and retried. 404 maps to `NotFound`, other non-2xx to `ApiError`.
    pub async fn get_response(&self, url: &str, accept: Option<&str>) -> Result<HttpResponse> {
        let origin = origin_of(url);
        let mut headers = HeaderMap::new();
        if let Some(accept) = accept.and_then(|a| HeaderValue::from_str(a).ok()) {
            headers.insert(ACCEPT, accept);
        }
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| MetadataError::Config("token is not a valid header value".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut attempt = 0u32;
        loop {
            self.before_call(&origin).await;
            debug!(url, attempt, "GET");
            let resp = self.client.get(url).headers(headers.clone()).send().await;
            match resp {
                Ok(r) if r.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let governor = self.observe(&origin, r.headers()).await;
                    let retry_after = r
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok());
                    let wait = governor.backoff_after_429(Utc::now().timestamp(), retry_after);
                    if attempt >= self.max_retries {
                        return Err(MetadataError::RateLimit(origin, wait.as_secs()));
                    }
                    warn!(url, wait_secs = wait.as_secs(), resume = %resume_time(wait), "HTTP 429, waiting for reset");
                    sleep(wait).await;
                    attempt += 1;
                }
                Ok(r) if r.status() == StatusCode::NOT_FOUND => {
                    self.observe(&origin, r.headers()).await;
                    return Err(MetadataError::NotFound(url.to_string()));
                }
                Ok(r) if !r.status().is_success() => {
                    self.observe(&origin, r.headers()).await;
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(MetadataError::ApiError(
                        url.to_string(),
                        format!("HTTP {status}: {body}"),
                    ));
                }
                Ok(r) => {
                    self.observe(&origin, r.headers()).await;
                    let status = r.status().as_u16();
                    let headers = r.headers().clone();
                    let body = r.text().await?;
                    return Ok(HttpResponse { status, headers, body });
                }
                Err(e) => {
                    if attempt >= self.max_retries || !(e.is_timeout() || e.is_connect()) {
                        return Err(MetadataError::Http(e));
                    }
                    let unit = self.governor_for(url).await.speed_bump();
                    warn!(url, attempt, error = %e, "transient failure, retrying");
                    sleep(unit).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// `scheme://host[:port]` of a URL, or the input itself when it does not parse.
pub fn origin_of(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_else(|_| url.to_string())
}
