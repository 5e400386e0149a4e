//! Anti-forgery token store.
//!
//! # Design Decisions
//! - Tokens are 256 random bits, hex-encoded
//! - `verify` does the same work whether a token is unknown or expired and
//!   answers with a plain bool
//! - Expired tokens are only removed by `sweep`, never on the request path

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::RngCore;

use crate::config::SecurityConfig;
use crate::security::clock::{Clock, SystemClock};

/// Header carrying the token on state-changing requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

const TOKEN_BYTES: usize = 32;

/// Token lifetime rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsrfPolicy {
    pub ttl: Duration,
    pub single_use: bool,
}

impl From<&SecurityConfig> for CsrfPolicy {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            ttl: Duration::from_millis(config.csrf_ttl_ms),
            single_use: config.csrf_single_use,
        }
    }
}

impl Default for CsrfPolicy {
    fn default() -> Self {
        Self::from(&SecurityConfig::default())
    }
}

/// Issued tokens and their issue instants.
#[derive(Debug)]
pub struct CsrfTokenStore {
    tokens: DashMap<String, Instant>,
    clock: Arc<dyn Clock>,
}

impl CsrfTokenStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: DashMap::new(),
            clock,
        }
    }

    /// Issue a fresh token.
    pub fn issue(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        self.tokens.insert(token.clone(), self.clock.now());
        token
    }

    /// Check a presented token.
    pub fn verify(&self, token: &str, policy: &CsrfPolicy) -> bool {
        let now = self.clock.now();
        let issued_at = self.tokens.get(token).map(|entry| *entry.value());

        let age = now.saturating_duration_since(issued_at.unwrap_or(now));
        // Non-short-circuit `&` keeps both operands evaluated.
        let valid = issued_at.is_some() & (age < policy.ttl);

        if valid && policy.single_use {
            return self.tokens.remove(token).is_some();
        }
        valid
    }

    /// Revoke a token. Returns whether it existed.
    pub fn invalidate(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    /// Remove tokens older than the TTL. Returns the number removed.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let now = self.clock.now();
        let before = self.tokens.len();
        self.tokens
            .retain(|_, issued_at| now.saturating_duration_since(*issued_at) < ttl);
        before.saturating_sub(self.tokens.len())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn clear(&self) {
        self.tokens.clear();
    }
}

impl Default for CsrfTokenStore {
    fn default() -> Self {
        Self::new()
    }
}
