//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Gateway → Registry load_all → Sweeper → Listener
//!
//! Serving (runner.rs):
//!     Watcher → Listener → HTTP server until stop or server exit
//!
//! Shutdown (shutdown.rs, runner.rs):
//!     Signal received → Stop accepting → Drain requests → Kernel::shutdown → Exit
//!     (also reached when binding or the server fails)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then modules, then listeners
//! - Module teardown is bounded per module; shutdown always completes

pub mod runner;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use runner::{run_until, RunError};
pub use shutdown::Shutdown;
pub use startup::Kernel;
