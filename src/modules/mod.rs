//! Module lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     catalog.rs (registration table)
//!     → registry.discover() (deny-list, disabled list, sorted)
//!     → registry.load_all(ctx)
//!         factory(ctx)   → load-error on failure
//!         initialize()   → init-error on failure, ready otherwise
//!
//! Request path:
//!     route handler → registry.get(name) → Module::status / health
//!
//! Shutdown:
//!     registry.destroy_all() → destroy() per instance under a deadline
//! ```

pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod heartbeat;
pub mod registry;
pub mod traits;

pub use catalog::{is_infrastructure, ModuleCatalog, DENY_LIST};
pub use descriptor::{DestroyReport, LoadReport, ModuleStatus, StatusReport, Summary};
pub use error::ModuleError;
pub use registry::ModuleRegistry;
pub use traits::{Module, ModuleContext, ModuleFactory, ModuleHealth};
