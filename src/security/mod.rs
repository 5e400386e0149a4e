//! Security subsystem: the request admission gateway.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → fingerprint.rs (anonymized client id)
//!     → rate_limit.rs (per-client sliding window)
//!     → limits.rs (content type, declared size)
//!     → csrf.rs (token or bearer credential on mutating methods)
//!     → Pass to route handler
//! Outgoing response:
//!     → headers.rs (hardening headers, HSTS on secure transports)
//!
//! Background:
//!     sweeper.rs → gateway.sweep() every interval
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - Stores are owned by the gateway instance, never global

pub mod clock;
pub mod csrf;
pub mod error;
pub mod fingerprint;
pub mod gateway;
pub mod headers;
pub mod limits;
pub mod rate_limit;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use csrf::{CsrfPolicy, CsrfTokenStore, CSRF_HEADER};
pub use error::AdmissionError;
pub use fingerprint::ClientFingerprint;
pub use gateway::{GatewayPolicy, RejectionCounts, SecurityGateway, SweepReport};
pub use headers::security_headers;
pub use limits::{RequestValidator, Validation};
pub use rate_limit::{RateDecision, RateLimiter, RatePolicy};
pub use sweeper::Sweeper;
