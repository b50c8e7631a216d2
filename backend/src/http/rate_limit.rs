//! Fixed-window rate limiting.
//!
//! Each rate-limited route carries a [`RatePolicy`] (a name and a request
//! budget per window). Requests are counted per `(policy, client)` inside
//! windows aligned on multiples of `window_secs`; the counter resets when the
//! next window starts. Counters live in process memory.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;

use super::error::AppError;
use crate::models::unix_now;

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

/// Counters are pruned once the table grows past this many entries.
const PRUNE_THRESHOLD: usize = 10_000;

/// A named request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub name: &'static str,
    pub limit: u32,
}

impl RatePolicy {
    pub const fn new(name: &'static str, limit: u32) -> Self {
        Self { name, limit }
    }
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix seconds at which the current window ends.
    pub reset: i64,
    pub now: i64,
}

impl RateDecision {
    pub fn retry_after(&self) -> i64 {
        (self.reset - self.now).max(0)
    }

    pub fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(HEADER_LIMIT, HeaderValue::from(self.limit));
        headers.insert(HEADER_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(HEADER_RESET, HeaderValue::from(self.reset));
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: i64,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    window_secs: i64,
    counters: Mutex<HashMap<(&'static str, String), Window>>,
}

impl RateLimiter {
    pub fn new(enabled: bool, window_secs: u64) -> Self {
        Self {
            enabled,
            window_secs: i64::try_from(window_secs.max(1)).unwrap_or(i64::MAX),
            counters: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn check(&self, policy: RatePolicy, client: &str) -> RateDecision {
        self.check_at(policy, client, unix_now())
    }

    /// Count one request from `client` against `policy` at time `now`.
    ///
    /// Rejected requests are not counted.
    pub fn check_at(&self, policy: RatePolicy, client: &str, now: i64) -> RateDecision {
        let start = now - now.rem_euclid(self.window_secs);
        let reset = start + self.window_secs;

        let mut counters = self.counters.lock();
        if counters.len() > PRUNE_THRESHOLD {
            counters.retain(|_, window| window.start >= start);
        }

        let window = counters
            .entry((policy.name, client.to_string()))
            .or_insert(Window { start, count: 0 });
        if window.start != start {
            *window = Window { start, count: 0 };
        }

        let allowed = window.count < policy.limit;
        if allowed {
            window.count += 1;
        }

        RateDecision {
            allowed,
            limit: policy.limit,
            remaining: policy.limit.saturating_sub(window.count),
            reset,
            now,
        }
    }
}

/// Middleware state: the shared limiter plus the policy of one route.
#[derive(Debug, Clone)]
pub struct RateGuard {
    pub limiter: Arc<RateLimiter>,
    pub policy: RatePolicy,
}

impl RateGuard {
    pub fn new(limiter: Arc<RateLimiter>, policy: RatePolicy) -> Self {
        Self { limiter, policy }
    }
}

/// Client key: the peer address, else the first `X-Forwarded-For` hop.
pub fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Count the request and either reject it with 429 or pass it on, adding
/// the `X-RateLimit-*` headers to the response.
pub async fn enforce(State(guard): State<RateGuard>, request: Request, next: Next) -> Response {
    if !guard.limiter.is_enabled() {
        return next.run(request).await;
    }

    let client = client_key(&request);
    let decision = guard.limiter.check(guard.policy, &client);
    if !decision.allowed {
        tracing::debug!(policy = guard.policy.name, %client, "rate limit hit");
        return AppError::TooManyRequests(decision).into_response();
    }

    let mut response = next.run(request).await;
    decision.write_headers(response.headers_mut());
    response
}
