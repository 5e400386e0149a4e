//! Platform kernel library: security admission gateway and module registry.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod modules;
pub mod observability;
pub mod security;

pub use config::schema::KernelConfig;
pub use http::HttpServer;
pub use lifecycle::{Kernel, Shutdown};
pub use modules::{Module, ModuleCatalog, ModuleRegistry};
pub use security::SecurityGateway;
