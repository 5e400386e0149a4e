//! Admission gateway: the ordered middleware chain in front of every route.
//!
//! ```text
//! security_headers ─┐ (decorates every response, rejections included)
//!   rate_limit      │ 429 + RateLimit-* headers
//!   validate_request│ 400 / 413 (buffers bodies sent without Content-Length)
//!   csrf_protect    │ 403 (mutating methods only)
//!   handler        ◀┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tower::ServiceBuilder;

use crate::config::SecurityConfig;
use crate::observability::metrics;
use crate::security::clock::{Clock, SystemClock};
use crate::security::csrf::{CsrfPolicy, CsrfTokenStore, CSRF_HEADER};
use crate::security::error::AdmissionError;
use crate::security::fingerprint::ClientFingerprint;
use crate::security::headers::{apply_security_headers, is_secure_request};
use crate::security::limits::{is_mutating, RequestValidator};
use crate::security::rate_limit::{RateLimiter, RatePolicy};

/// Everything derived from one `SecurityConfig`, swapped as a unit on reload.
#[derive(Debug)]
pub struct GatewayPolicy {
    pub config: SecurityConfig,
    pub rate: RatePolicy,
    pub csrf: CsrfPolicy,
    pub validator: RequestValidator,
    api_key_digests: Vec<[u8; 32]>,
}

impl GatewayPolicy {
    pub fn new(config: SecurityConfig) -> Self {
        Self {
            rate: RatePolicy::from(&config),
            csrf: CsrfPolicy::from(&config),
            validator: RequestValidator::from_config(&config),
            api_key_digests: config.api_keys.iter().map(|k| digest(k)).collect(),
            config,
        }
    }

    /// Whether `Authorization: Bearer <key>` names a configured key.
    ///
    /// Keys are compared by digest so the time taken does not depend on how
    /// many leading bytes match.
    pub fn has_valid_credential(&self, headers: &axum::http::HeaderMap) -> bool {
        if self.api_key_digests.is_empty() {
            return false;
        }
        let Some(presented) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        else {
            return false;
        };
        let presented = digest(presented.trim());
        self.api_key_digests
            .iter()
            .fold(false, |found, key| found | (*key == presented))
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Running totals of gateway decisions.
#[derive(Debug, Default)]
pub struct AdmissionCounters {
    requests: AtomicU64,
    rate_limited: AtomicU64,
    invalid_request: AtomicU64,
    payload_too_large: AtomicU64,
    csrf_rejected: AtomicU64,
}

/// Point-in-time copy of [`AdmissionCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RejectionCounts {
    pub rate_limited: u64,
    pub invalid_request: u64,
    pub payload_too_large: u64,
    pub csrf_rejected: u64,
}

impl AdmissionCounters {
    fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        metrics::record_request();
    }

    fn record_rejection(&self, error: &AdmissionError) {
        let counter = match error {
            AdmissionError::RateLimited { .. } => &self.rate_limited,
            AdmissionError::UnsupportedMediaType
            | AdmissionError::InvalidContentLength
            | AdmissionError::UnreadableBody => &self.invalid_request,
            AdmissionError::PayloadTooLarge { .. } | AdmissionError::BodyTooLarge { .. } => {
                &self.payload_too_large
            }
            AdmissionError::CsrfRejected => &self.csrf_rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::record_rejection(error.reason());
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn rejections(&self) -> RejectionCounts {
        RejectionCounts {
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            invalid_request: self.invalid_request.load(Ordering::Relaxed),
            payload_too_large: self.payload_too_large.load(Ordering::Relaxed),
            csrf_rejected: self.csrf_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Result of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rate_limit_entries: usize,
    pub csrf_tokens: usize,
}

/// The admission gateway and the stores it owns.
#[derive(Debug)]
pub struct SecurityGateway {
    policy: ArcSwap<GatewayPolicy>,
    rate_limiter: RateLimiter,
    csrf: CsrfTokenStore,
    counters: AdmissionCounters,
    clock: Arc<dyn Clock>,
}

impl SecurityGateway {
    pub fn new(config: SecurityConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SecurityConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy: ArcSwap::from_pointee(GatewayPolicy::new(config)),
            rate_limiter: RateLimiter::with_clock(clock.clone()),
            csrf: CsrfTokenStore::with_clock(clock.clone()),
            counters: AdmissionCounters::default(),
            clock,
        }
    }

    /// Current policy snapshot.
    pub fn policy(&self) -> Arc<GatewayPolicy> {
        self.policy.load_full()
    }

    /// Replace the policy. Counters and issued tokens are kept.
    pub fn reload(&self, config: SecurityConfig) {
        tracing::info!(
            rate_limiting = config.enable_rate_limiting,
            max_requests_per_minute = config.max_requests_per_minute,
            validation = config.enable_request_validation,
            csrf = config.enable_csrf_protection,
            "Admission policy reloaded"
        );
        self.policy.store(Arc::new(GatewayPolicy::new(config)));
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn csrf_store(&self) -> &CsrfTokenStore {
        &self.csrf
    }

    pub fn counters(&self) -> &AdmissionCounters {
        &self.counters
    }

    pub fn issue_csrf_token(&self) -> String {
        self.csrf.issue()
    }

    /// Prune expired rate-limit instants and CSRF tokens.
    pub fn sweep(&self) -> SweepReport {
        let policy = self.policy();
        let report = SweepReport {
            rate_limit_entries: self.rate_limiter.sweep(policy.rate.window),
            csrf_tokens: self.csrf.sweep(policy.csrf.ttl),
        };
        metrics::record_store_sizes(self.rate_limiter.tracked_clients(), self.csrf.len());
        report
    }

    /// Drop all per-client and token state.
    pub fn destroy(&self) {
        self.rate_limiter.clear();
        self.csrf.clear();
        tracing::debug!("Gateway stores cleared");
    }

    /// Wrap `router` in the admission chain.
    pub fn apply<S>(self: &Arc<Self>, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(self.clone(), security_headers))
                .layer(middleware::from_fn_with_state(self.clone(), rate_limit))
                .layer(middleware::from_fn_with_state(self.clone(), validate_request))
                .layer(middleware::from_fn_with_state(self.clone(), csrf_protect)),
        )
    }

    fn reject(&self, error: AdmissionError, client: Option<&ClientFingerprint>) -> Response {
        tracing::warn!(
            client = client.map(ClientFingerprint::as_str).unwrap_or("-"),
            status = error.status().as_u16(),
            reason = error.reason(),
            "Request rejected"
        );
        self.counters.record_rejection(&error);
        error.into_response()
    }
}

/// Stage 1: per-client sliding window.
pub async fn rate_limit(
    State(gateway): State<Arc<SecurityGateway>>,
    request: Request,
    next: Next,
) -> Response {
    gateway.counters.record_request();
    let policy = gateway.policy();
    if !policy.rate.enabled {
        return next.run(request).await;
    }

    let client = ClientFingerprint::from_request(&request);
    let decision = gateway.rate_limiter.allow(&client, &policy.rate);
    let now = gateway.clock.now();

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        let error = AdmissionError::RateLimited {
            retry_after: decision.reset_after(now),
        };
        gateway.reject(error, Some(&client))
    };
    decision.write_headers(response.headers_mut(), now);
    response
}

/// Stage 2: Content-Type and body size.
///
/// A mutating request without Content-Length has its body buffered here, up to
/// the ceiling, so the size rule holds for chunked uploads too.
pub async fn validate_request(
    State(gateway): State<Arc<SecurityGateway>>,
    request: Request,
    next: Next,
) -> Response {
    let policy = gateway.policy();
    if !policy.config.enable_request_validation {
        return next.run(request).await;
    }

    if let Err(error) = policy.validator.check(request.method(), request.headers()) {
        let client = ClientFingerprint::from_request(&request);
        return gateway.reject(error, Some(&client));
    }

    if !is_mutating(request.method()) || request.headers().contains_key(header::CONTENT_LENGTH) {
        return next.run(request).await;
    }

    let client = ClientFingerprint::from_request(&request);
    let (parts, body) = request.into_parts();
    match policy.validator.collect_body(body).await {
        Ok(bytes) => next.run(Request::from_parts(parts, Body::from(bytes))).await,
        Err(error) => gateway.reject(error, Some(&client)),
    }
}

/// Stage 3: CSRF token or bearer credential on state-changing methods.
pub async fn csrf_protect(
    State(gateway): State<Arc<SecurityGateway>>,
    request: Request,
    next: Next,
) -> Response {
    let policy = gateway.policy();
    if !policy.config.enable_csrf_protection || !is_mutating(request.method()) {
        return next.run(request).await;
    }

    if policy.has_valid_credential(request.headers()) {
        return next.run(request).await;
    }

    let token_ok = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|token| gateway.csrf.verify(token, &policy.csrf))
        .unwrap_or(false);

    if token_ok {
        next.run(request).await
    } else {
        let client = ClientFingerprint::from_request(&request);
        gateway.reject(AdmissionError::CsrfRejected, Some(&client))
    }
}

/// Outer stage: hardening headers on every response.
pub async fn security_headers(
    State(gateway): State<Arc<SecurityGateway>>,
    request: Request,
    next: Next,
) -> Response {
    let policy = gateway.policy();
    if !policy.config.enable_headers {
        return next.run(request).await;
    }

    let secure = is_secure_request(&request, policy.config.trust_forwarded_proto);
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut(), secure);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;
    use axum::http::HeaderMap;
    use std::time::Duration;

    fn config_with_keys(keys: &[&str]) -> SecurityConfig {
        SecurityConfig {
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn test_bearer_credential() {
        let policy = GatewayPolicy::new(config_with_keys(&["k-one", "k-two"]));

        let mut headers = HeaderMap::new();
        assert!(!policy.has_valid_credential(&headers));

        headers.insert(header::AUTHORIZATION, "Bearer k-two".parse().unwrap());
        assert!(policy.has_valid_credential(&headers));

        headers.insert(header::AUTHORIZATION, "Bearer k-three".parse().unwrap());
        assert!(!policy.has_valid_credential(&headers));

        headers.insert(header::AUTHORIZATION, "Basic k-one".parse().unwrap());
        assert!(!policy.has_valid_credential(&headers));
    }

    #[test]
    fn test_no_keys_means_no_credential() {
        let policy = GatewayPolicy::new(SecurityConfig::default());
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(!policy.has_valid_credential(&headers));
    }

    #[test]
    fn test_sweep_and_destroy() {
        let clock = Arc::new(ManualClock::new());
        let gateway = SecurityGateway::with_clock(SecurityConfig::default(), clock.clone());
        let client = ClientFingerprint::derive([127, 0, 0, 1].into(), None);

        gateway.rate_limiter().allow(&client, &gateway.policy().rate);
        gateway.issue_csrf_token();
        assert_eq!(gateway.sweep(), SweepReport::default());

        clock.advance(Duration::from_secs(3600));
        assert_eq!(
            gateway.sweep(),
            SweepReport {
                rate_limit_entries: 1,
                csrf_tokens: 1
            }
        );

        gateway.issue_csrf_token();
        gateway.destroy();
        assert!(gateway.csrf_store().is_empty());
    }

    #[test]
    fn test_reload_keeps_state() {
        let gateway = SecurityGateway::new(SecurityConfig::default());
        let token = gateway.issue_csrf_token();

        gateway.reload(SecurityConfig {
            max_requests_per_minute: 7,
            ..SecurityConfig::default()
        });

        assert_eq!(gateway.policy().rate.max_requests, 7);
        assert!(gateway.csrf_store().verify(&token, &gateway.policy().csrf));
    }
}
