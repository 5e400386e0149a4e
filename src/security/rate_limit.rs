//! Sliding window rate limiting keyed by client fingerprint.
//!
//! Each client owns the ordered list of its admitted request instants inside
//! the trailing window. A request is admitted only while fewer than
//! `max_requests` instants remain after pruning; a rejected request is not
//! recorded, so hammering a closed window never extends it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::SecurityConfig;
use crate::security::clock::{Clock, SystemClock};
use crate::security::fingerprint::ClientFingerprint;

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Limits applied by [`RateLimiter::allow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub enabled: bool,
    pub max_requests: u32,
    pub window: Duration,
}

impl From<&SecurityConfig> for RatePolicy {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            enabled: config.enable_rate_limiting,
            max_requests: config.max_requests_per_minute,
            window: Duration::from_secs(config.rate_limit_window_secs),
        }
    }
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self::from(&SecurityConfig::default())
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Instant at which the oldest counted request leaves the window.
    pub reset_at: Instant,
}

impl RateDecision {
    /// Time left until `reset_at`.
    pub fn reset_after(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }

    /// Write `RateLimit-*` headers; the reset is in whole seconds, rounded up.
    pub fn write_headers(&self, headers: &mut HeaderMap, now: Instant) {
        let reset = self.reset_after(now);
        let reset_secs = reset.as_secs() + u64::from(reset.subsec_nanos() > 0);
        headers.insert(RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(RATELIMIT_RESET, HeaderValue::from(reset_secs));
    }
}

/// Per-client sliding window counter.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<ClientFingerprint, VecDeque<Instant>>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Check and, if admitted, record a request for `client`.
    pub fn allow(&self, client: &ClientFingerprint, policy: &RatePolicy) -> RateDecision {
        let now = self.clock.now();

        if !policy.enabled {
            return RateDecision {
                allowed: true,
                limit: policy.max_requests,
                remaining: policy.max_requests,
                reset_at: now + policy.window,
            };
        }

        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let window = windows.entry(client.clone()).or_default();
        prune(window, now, policy.window);

        let count = window.len() as u32;
        if count >= policy.max_requests {
            let oldest = window.front().copied().unwrap_or(now);
            if window.is_empty() {
                windows.remove(client);
            }
            return RateDecision {
                allowed: false,
                limit: policy.max_requests,
                remaining: 0,
                reset_at: oldest + policy.window,
            };
        }

        window.push_back(now);
        let oldest = window.front().copied().unwrap_or(now);
        RateDecision {
            allowed: true,
            limit: policy.max_requests,
            remaining: policy.max_requests - (count + 1),
            reset_at: oldest + policy.window,
        }
    }

    /// Drop expired instants and evict clients left with none.
    ///
    /// Returns the number of evicted clients.
    pub fn sweep(&self, window: Duration) -> usize {
        let now = self.clock.now();
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let before = windows.len();
        windows.retain(|_, stamps| {
            prune(stamps, now, window);
            !stamps.is_empty()
        });
        before - windows.len()
    }

    /// Number of clients with at least one counted request.
    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().expect("rate limiter mutex poisoned").len()
    }

    /// Total counted requests across all clients.
    pub fn tracked_requests(&self) -> usize {
        self.windows
            .lock()
            .expect("rate limiter mutex poisoned")
            .values()
            .map(VecDeque::len)
            .sum()
    }

    pub fn clear(&self) {
        self.windows.lock().expect("rate limiter mutex poisoned").clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Instants are ordered, so expired ones are always at the front.
fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = stamps.front() {
        if now.saturating_duration_since(oldest) >= window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}
