use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::state::AppState;

const WINDOW: Duration = Duration::from_secs(3600);

/// Which per-IP budget a route group draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateScope {
    General,
    Upload,
    Processing,
}

impl RateScope {
    fn limit(&self, state: &AppState) -> u32 {
        match self {
            RateScope::General => state.config.rate_limit_general,
            RateScope::Upload => state.config.rate_limit_upload,
            RateScope::Processing => state.config.rate_limit_processing,
        }
    }
}

struct Window {
    started: Instant,
    count: u32,
}

/// The outcome of one admission check, also used to fill the
/// `X-RateLimit-*` response headers.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after_secs: u64,
}

/// Fixed-window request counting per (scope, client address). Windows are
/// reset lazily on the next check after they expire.
pub struct RateLimiter {
    windows: Mutex<HashMap<(RateScope, IpAddr), Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, scope: RateScope, ip: IpAddr, limit: u32) -> RateDecision {
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        let now = Instant::now();
        let window = windows.entry((scope, ip)).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= WINDOW {
            window.started = now;
            window.count = 0;
        }

        let allowed = window.count < limit;
        if allowed {
            window.count += 1;
        }

        let elapsed = now.duration_since(window.started);
        RateDecision {
            allowed,
            limit,
            remaining: limit.saturating_sub(window.count),
            reset_after_secs: WINDOW.saturating_sub(elapsed).as_secs(),
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Axum middleware enforcing one scope's budget and advertising the
/// remaining quota on every response.
pub async fn enforce(
    State((state, scope)): State<(AppState, RateScope)>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let limit = scope.limit(&state);
    let decision = state.rate_limiter.check(scope, addr.ip(), limit);

    if !decision.allowed {
        tracing::warn!("rate limit exceeded for {} ({:?})", addr.ip(), scope);
        let mut response = ApiError::RateLimited(format!(
            "rate limit of {limit} requests per hour exceeded; try again later"
        ))
        .into_response();
        apply_headers(&mut response, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(&mut response, &decision);
    response
}

fn apply_headers(response: &mut Response, decision: &RateDecision) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", int_header(decision.limit as u64));
    headers.insert("X-RateLimit-Remaining", int_header(decision.remaining as u64));
    headers.insert("X-RateLimit-Reset", int_header(decision.reset_after_secs));
}

fn int_header(value: u64) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).expect("numeric header value")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, last])
    }

    #[test]
    fn test_counts_up_to_the_limit() {
        let limiter = RateLimiter::new();
        for i in 0..5 {
            let decision = limiter.check(RateScope::Upload, ip(1), 5);
            assert!(decision.allowed, "request {i} should pass");
            assert_eq!(decision.remaining, 4 - i);
        }
        let decision = limiter.check(RateScope::Upload, ip(1), 5);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_scopes_and_addresses_are_independent() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.check(RateScope::Upload, ip(1), 3).allowed);
        }
        assert!(!limiter.check(RateScope::Upload, ip(1), 3).allowed);

        // Other address, same scope
        assert!(limiter.check(RateScope::Upload, ip(2), 3).allowed);
        // Same address, other scope
        assert!(limiter.check(RateScope::General, ip(1), 3).allowed);
    }

    #[test]
    fn test_expired_window_resets() {
        let limiter = RateLimiter::new();
        assert!(!limiter.check(RateScope::General, ip(3), 0).allowed);

        // Age the window past its span, then the counter starts over.
        let Some(past) = Instant::now().checked_sub(WINDOW + Duration::from_secs(1)) else {
            return; // monotonic clock too close to boot to backdate
        };
        {
            let mut windows = limiter.windows.lock().unwrap();
            let window = windows.get_mut(&(RateScope::General, ip(3))).unwrap();
            window.started = past;
            window.count = 100;
        }
        let decision = limiter.check(RateScope::General, ip(3), 2);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[test]
    fn test_reset_header_counts_down_within_window() {
        let limiter = RateLimiter::new();
        let decision = limiter.check(RateScope::General, ip(4), 10);
        assert!(decision.reset_after_secs <= WINDOW.as_secs());
        assert!(decision.reset_after_secs > WINDOW.as_secs() - 5);
    }
}
