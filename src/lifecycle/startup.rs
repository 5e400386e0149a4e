//! Kernel assembly and ordered teardown.
//!
//! Startup: gateway → registry → `load_all` → sweeper.
//! Shutdown: sweeper stop → `destroy_all` → gateway stores cleared.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::{validation::validate_security, KernelConfig};
use crate::lifecycle::shutdown::Shutdown;
use crate::modules::{DestroyReport, LoadReport, ModuleCatalog, ModuleContext, ModuleRegistry};
use crate::observability::StatsReporter;
use crate::security::{SecurityGateway, Sweeper};

/// The running kernel: admission gateway, module registry and their
/// background work.
#[derive(Debug)]
pub struct Kernel {
    config: KernelConfig,
    gateway: Arc<SecurityGateway>,
    registry: Arc<ModuleRegistry>,
    stats: StatsReporter,
    load_report: LoadReport,
    shutdown: Shutdown,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Kernel {
    /// Build the kernel, load all modules and start the sweeper.
    pub async fn start(config: KernelConfig, catalog: ModuleCatalog) -> Self {
        let gateway = Arc::new(SecurityGateway::new(config.security.clone()));
        Self::start_with_gateway(config, catalog, gateway).await
    }

    /// Like [`Kernel::start`] with a caller-built gateway (e.g. on a manual clock).
    pub async fn start_with_gateway(
        config: KernelConfig,
        catalog: ModuleCatalog,
        gateway: Arc<SecurityGateway>,
    ) -> Self {
        let registry = Arc::new(ModuleRegistry::new(catalog, &config.modules));
        let ctx = ModuleContext::from_config(&config.modules);
        let load_report = registry.load_all(&ctx).await;

        let shutdown = Shutdown::new();
        let sweeper = Sweeper::new(
            gateway.clone(),
            Duration::from_secs(config.security.sweep_interval_secs),
        )
        .spawn(shutdown.subscribe());

        tracing::info!(
            modules_ready = load_report.ready,
            modules_failed = load_report.failed,
            "Kernel started"
        );

        Self {
            stats: StatsReporter::new(gateway.clone(), registry.clone()),
            config,
            gateway,
            registry,
            load_report,
            shutdown,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<SecurityGateway> {
        &self.gateway
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &StatsReporter {
        &self.stats
    }

    /// Fires when [`Kernel::shutdown`] begins.
    pub fn shutdown_signal(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn load_report(&self) -> LoadReport {
        self.load_report
    }

    /// Apply a reloaded configuration. Only the admission policy is live.
    pub fn apply_config(&self, new: &KernelConfig) {
        if new.security == self.gateway.policy().config {
            tracing::debug!("Admission policy unchanged");
            return;
        }
        match validate_security(&new.security) {
            Ok(()) => self.gateway.reload(new.security.clone()),
            Err(errors) => {
                for e in errors {
                    tracing::error!(error = %e, "Rejected admission policy reload");
                }
            }
        }
    }

    /// Stop background work and destroy all modules. Idempotent.
    pub async fn shutdown(&self) -> DestroyReport {
        if !self.shutdown.trigger() {
            return DestroyReport::default();
        }

        let sweeper = self.sweeper.lock().expect("kernel mutex poisoned").take();
        if let Some(handle) = sweeper {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Sweeper task ended abnormally");
            }
        }

        let report = self.registry.destroy_all().await;
        self.gateway.destroy();
        tracing::info!("Kernel stopped");
        report
    }
}
