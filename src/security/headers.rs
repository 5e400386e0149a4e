//! Security response headers.
//!
//! # Responsibilities
//! - Compute the fixed browser-hardening header set
//! - Add Strict-Transport-Security only for secure transports
//!
//! # Design Decisions
//! - Pure functions; the gateway stage decides when to apply them
//! - `X-Forwarded-Proto` is trusted only when configured

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};

pub const X_XSS_PROTECTION: HeaderName = HeaderName::from_static("x-xss-protection");
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self'; \
     style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; \
     frame-ancestors 'none'";
const HSTS: &str = "max-age=31536000; includeSubDomains";

/// Headers to set on a response.
pub fn security_headers(is_secure: bool) -> Vec<(HeaderName, HeaderValue)> {
    let mut headers = vec![
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
        (
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ),
    ];
    if is_secure {
        headers.push((header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS)));
    }
    headers
}

/// Overwrite the security headers on `target`.
pub fn apply_security_headers(target: &mut HeaderMap, is_secure: bool) {
    for (name, value) in security_headers(is_secure) {
        target.insert(name, value);
    }
}

/// Whether the request arrived over TLS.
pub fn is_secure_request<B>(request: &Request<B>, trust_forwarded_proto: bool) -> bool {
    if request.uri().scheme_str() == Some("https") {
        return true;
    }
    trust_forwarded_proto
        && request
            .headers()
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false)
}
