//! Request admission checks.
//!
//! # Responsibilities
//! - Require an allow-listed Content-Type on state-changing methods
//! - Enforce maximum declared body size from Content-Length
//! - Count undeclared (chunked) bodies against the same ceiling
//!
//! # Design Decisions
//! - Header checks run before any body byte is read
//! - A body without Content-Length is buffered up to the ceiling and no further
//! - Rules short-circuit in order: method, content type, size
//! - Media type parameters (`; charset=...`) are ignored

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, StatusCode};
use futures_util::StreamExt;

use crate::config::SecurityConfig;
use crate::security::error::AdmissionError;

/// Outcome of [`RequestValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub ok: bool,
    pub code: StatusCode,
    pub reason: String,
}

/// Header-level request validator.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    allowed_content_types: Vec<String>,
    max_payload_bytes: u64,
}

/// GET, HEAD and OPTIONS are the only methods treated as read-only.
pub fn is_mutating(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

impl RequestValidator {
    pub fn new(allowed_content_types: &[String], max_payload_bytes: u64) -> Self {
        Self {
            allowed_content_types: allowed_content_types
                .iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .collect(),
            max_payload_bytes,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(&config.allowed_content_types, config.max_payload_bytes)
    }

    /// Apply the rules, reporting the first failure.
    pub fn check(&self, method: &Method, headers: &HeaderMap) -> Result<(), AdmissionError> {
        if !is_mutating(method) {
            return Ok(());
        }

        let media_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase());

        match media_type {
            Some(ref t) if self.allowed_content_types.iter().any(|a| a == t) => {}
            _ => return Err(AdmissionError::UnsupportedMediaType),
        }

        if let Some(value) = headers.get(header::CONTENT_LENGTH) {
            let size: u64 = value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .ok_or(AdmissionError::InvalidContentLength)?;
            if size > self.max_payload_bytes {
                return Err(AdmissionError::PayloadTooLarge {
                    size,
                    max: self.max_payload_bytes,
                });
            }
        }

        Ok(())
    }

    /// Apply the rules and describe the result.
    pub fn validate(&self, method: &Method, headers: &HeaderMap) -> Validation {
        match self.check(method, headers) {
            Ok(()) => Validation {
                ok: true,
                code: StatusCode::OK,
                reason: String::new(),
            },
            Err(e) => Validation {
                ok: false,
                code: e.status(),
                reason: e.to_string(),
            },
        }
    }

    /// Buffer a body of undeclared length, giving up once it passes the
    /// ceiling.
    pub async fn collect_body(&self, body: Body) -> Result<Bytes, AdmissionError> {
        let mut stream = body.into_data_stream();
        let mut buffered = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::debug!(error = %e, "Request body stream failed");
                AdmissionError::UnreadableBody
            })?;
            if (buffered.len() + chunk.len()) as u64 > self.max_payload_bytes {
                return Err(AdmissionError::BodyTooLarge {
                    max: self.max_payload_bytes,
                });
            }
            buffered.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buffered))
    }

    pub fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}
