//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → KernelConfig (validated, immutable)
//!     → security section handed to the gateway, modules section to the registry
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the gateway's SecurityConfig
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Only the admission policy is hot-reloadable; listener and module
//!   settings need a restart
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    KernelConfig, ListenerConfig, LogFormat, ModulesConfig, ObservabilityConfig, SecurityConfig,
    TimeoutConfig,
};
