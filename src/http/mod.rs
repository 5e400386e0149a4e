//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, outer layers)
//!     → request.rs (request ID, tracing span)
//!     → security gateway (headers → rate limit → validation → CSRF)
//!     → handlers.rs (health, modules, CSRF token, stats)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
