//! Per-IP rate limiting middleware using a sliding window.
//!
//! Credential endpoints get a tight budget; bearer routes a looser one.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::ApiError;
use crate::config::RateLimitConfig;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitTier {
    /// Bearer-authenticated routes
    Api,
    /// `/register` and `/login`
    Auth,
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Requests left in the current window
    tokens: u32,
    window_start: Instant,
    last_request: Instant,
}

impl RateLimitEntry {
    fn new(max_tokens: u32, now: Instant) -> Self {
        Self {
            tokens: max_tokens,
            window_start: now,
            last_request: now,
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<(IpAddr, RateLimitTier), RateLimitEntry>,
    config: RateLimitConfig,
    window_duration: Duration,
}

/// Budget left after an allowed request
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub remaining: u32,
    pub limit: u32,
    /// Seconds until the window resets
    pub reset_after: u64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            window_duration: Duration::from_secs(config.window_seconds),
            config,
        }
    }

    /// Consume one request from the budget of `(ip, tier)`.
    ///
    /// Returns the remaining budget, or the seconds to wait when exhausted.
    pub fn check(&self, ip: IpAddr, tier: RateLimitTier) -> Result<RateLimitInfo, u64> {
        self.check_at(ip, tier, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, tier: RateLimitTier, now: Instant) -> Result<RateLimitInfo, u64> {
        let limit = self.limit_for(tier);
        if !self.config.enabled {
            return Ok(RateLimitInfo {
                remaining: limit,
                limit,
                reset_after: 0,
            });
        }

        let mut entry = self
            .entries
            .entry((ip, tier))
            .or_insert_with(|| RateLimitEntry::new(limit, now));

        let elapsed = now.duration_since(entry.window_start);
        if elapsed >= self.window_duration {
            entry.tokens = limit;
            entry.window_start = now;
        } else {
            // Replenish in proportion to the time since the previous request
            let since_last = now.duration_since(entry.last_request);
            let rate = limit as f64 / self.window_duration.as_secs_f64();
            let replenished = (since_last.as_secs_f64() * rate) as u32;
            entry.tokens = entry.tokens.saturating_add(replenished).min(limit);
        }
        entry.last_request = now;

        let reset_after = self
            .window_duration
            .saturating_sub(now.duration_since(entry.window_start))
            .as_secs();

        if entry.tokens > 0 {
            entry.tokens -= 1;
            Ok(RateLimitInfo {
                remaining: entry.tokens,
                limit,
                reset_after,
            })
        } else {
            Err(reset_after.max(1))
        }
    }

    pub fn limit_for(&self, tier: RateLimitTier) -> u32 {
        match tier {
            RateLimitTier::Api => self.config.api_requests_per_window,
            RateLimitTier::Auth => self.config.auth_requests_per_window,
        }
    }

    /// Drop entries idle for more than two windows
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let expiry = self.window_duration * 2;
        self.entries
            .retain(|_, entry| now.duration_since(entry.last_request) < expiry);
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Client address: socket peer, then proxy headers, then loopback
fn client_ip(request: &Request<Body>) -> IpAddr {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }

    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    request
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub async fn rate_limit_api(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    rate_limit_with_tier(state, request, next, RateLimitTier::Api).await
}

pub async fn rate_limit_auth(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    rate_limit_with_tier(state, request, next, RateLimitTier::Auth).await
}

async fn rate_limit_with_tier(
    state: Arc<AppState>,
    request: Request<Body>,
    next: Next,
    tier: RateLimitTier,
) -> Response {
    let ip = client_ip(&request);

    match state.rate_limiter.check(ip, tier) {
        Ok(info) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(info.limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(info.remaining));
            headers.insert("x-ratelimit-reset", HeaderValue::from(info.reset_after));
            response
        }
        Err(retry_after) => {
            tracing::warn!(%ip, ?tier, retry_after, "Rate limit exceeded");
            let err = ApiError::rate_limited(format!(
                "Rate limit exceeded. Try again in {} seconds.",
                retry_after
            ));
            (
                [
                    (header::RETRY_AFTER, HeaderValue::from(retry_after)),
                    (
                        header::HeaderName::from_static("x-ratelimit-limit"),
                        HeaderValue::from(state.rate_limiter.limit_for(tier)),
                    ),
                ],
                err,
            )
                .into_response()
        }
    }
}

/// Periodically sweep idle limiter entries
pub fn spawn_cleanup_task(rate_limiter: Arc<RateLimiter>, cleanup_interval_secs: u64) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(cleanup_interval_secs.max(1));
        loop {
            tokio::time::sleep(interval).await;
            rate_limiter.cleanup_expired();
            tracing::debug!(
                entries = rate_limiter.entry_count(),
                "Rate limiter cleanup complete"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            api_requests_per_window: 10,
            auth_requests_per_window: 3,
            window_seconds: 60,
            cleanup_interval: 300,
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_blocks_after_limit() {
        let limiter = RateLimiter::new(test_config());
        let now = Instant::now();

        for i in 0..10 {
            assert!(
                limiter.check_at(ip("10.0.0.1"), RateLimitTier::Api, now).is_ok(),
                "request {} should be allowed",
                i
            );
        }
        let retry_after = limiter
            .check_at(ip("10.0.0.1"), RateLimitTier::Api, now)
            .unwrap_err();
        assert_eq!(retry_after, 60);
    }

    #[test]
    fn test_ips_and_tiers_are_independent() {
        let limiter = RateLimiter::new(test_config());
        let now = Instant::now();

        for _ in 0..3 {
            limiter.check_at(ip("10.0.0.1"), RateLimitTier::Auth, now).unwrap();
        }
        assert!(limiter.check_at(ip("10.0.0.1"), RateLimitTier::Auth, now).is_err());
        assert!(limiter.check_at(ip("10.0.0.2"), RateLimitTier::Auth, now).is_ok());
        assert!(limiter.check_at(ip("10.0.0.1"), RateLimitTier::Api, now).is_ok());
    }

    #[test]
    fn test_window_reset_restores_budget() {
        let limiter = RateLimiter::new(test_config());
        let start = Instant::now();

        for _ in 0..3 {
            limiter.check_at(ip("10.0.0.1"), RateLimitTier::Auth, start).unwrap();
        }
        let later = start + Duration::from_secs(61);
        let info = limiter
            .check_at(ip("10.0.0.1"), RateLimitTier::Auth, later)
            .unwrap();
        assert_eq!(info.remaining, 2);
    }

    #[test]
    fn test_disabled_allows_everything() {
        let mut config = test_config();
        config.enabled = false;
        let limiter = RateLimiter::new(config);

        for _ in 0..100 {
            assert!(limiter.check(ip("10.0.0.1"), RateLimitTier::Auth).is_ok());
        }
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn test_cleanup_keeps_recent_entries() {
        let limiter = RateLimiter::new(test_config());
        limiter.check(ip("10.0.0.1"), RateLimitTier::Api).unwrap();
        limiter.cleanup_expired();
        assert_eq!(limiter.entry_count(), 1);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header_without_socket() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), ip("203.0.113.7"));

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&bare), ip("127.0.0.1"));
    }
}
