//! Admission failures and their client-facing rendering.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// A request refused by the gateway.
///
/// Always terminates at the gateway boundary as a 4xx response; module code
/// never sees one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// Client exhausted its request window.
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Duration },

    /// Mutating request without an allow-listed Content-Type.
    #[error("Unsupported content type")]
    UnsupportedMediaType,

    /// Content-Length present but not a number.
    #[error("Invalid Content-Length header")]
    InvalidContentLength,

    /// Declared body exceeds the configured ceiling.
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: u64, max: u64 },

    /// Body sent without Content-Length ran past the ceiling.
    #[error("Payload too large: body exceeds {max} bytes")]
    BodyTooLarge { max: u64 },

    /// Body stream failed before it was fully read.
    #[error("Request body could not be read")]
    UnreadableBody,

    /// Mutating request with neither a valid CSRF token nor a credential.
    #[error("Missing or invalid CSRF token")]
    CsrfRejected,
}

impl AdmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UnsupportedMediaType | Self::InvalidContentLength | Self::UnreadableBody => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge { .. } | Self::BodyTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::CsrfRejected => StatusCode::FORBIDDEN,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::UnsupportedMediaType => "unsupported_media_type",
            Self::InvalidContentLength => "invalid_content_length",
            Self::PayloadTooLarge { .. } | Self::BodyTooLarge { .. } => "payload_too_large",
            Self::UnreadableBody => "unreadable_body",
            Self::CsrfRejected => "csrf_rejected",
        }
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        let mut response = (status, body).into_response();
        if let Self::RateLimited { retry_after } = self {
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }
        response
    }
}
