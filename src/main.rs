//! Platform kernel (v1)
//!
//! Hosts feature modules behind a security admission gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id → trace
//!                            │
//!                            ▼
//!                  ┌──────────────────────────────────────┐
//!                  │          SECURITY GATEWAY            │
//!                  │ headers → rate limit → validation →  │
//!                  │ CSRF (bearer API keys bypass)        │
//!                  │ → timeout → concurrency limit        │
//!                  └──────────────────┬───────────────────┘
//!                                     ▼
//!                  ┌──────────────────────────────────────┐
//!                  │   kernel endpoints (health, modules, │
//!                  │   csrf-token, stats)                 │
//!                  └──────────────────┬───────────────────┘
//!                                     ▼
//!                  ┌──────────────────────────────────────┐
//!                  │ MODULE REGISTRY                      │
//!                  │ catalog → discover → load_all        │
//!                  │ → destroy_all on shutdown            │
//!                  └──────────────────────────────────────┘
//!
//!     Cross-cutting: config (+ hot reload), observability, lifecycle
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use platform_kernel::config::validation::validate_config;
use platform_kernel::config::{load_config, ConfigError, KernelConfig};
use platform_kernel::lifecycle::{run_until, signals::wait_for_termination, Kernel};
use platform_kernel::observability::{logging, metrics};
use platform_kernel::ModuleCatalog;

#[derive(Parser)]
#[command(name = "platform-kernel")]
#[command(about = "Module host with a security admission gateway", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => load_config(path)?,
        None => KernelConfig::default(),
    };
    let mut config = file_config.clone();
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "platform-kernel starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let kernel = Arc::new(Kernel::start(config, ModuleCatalog::builtin()).await);
    let watch = cli.config.as_deref().map(|path| (path, file_config));
    run_until(kernel, watch, wait_for_termination()).await?;
    Ok(())
}
