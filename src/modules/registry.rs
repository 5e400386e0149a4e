//! Module registry: discovery, loading and teardown with per-module failure
//! isolation.
//!
//! # Design Decisions
//! - Every lifecycle call is turned into a `Result`; panics are caught and
//!   recorded like errors
//! - No module's failure aborts the batch; `initialize()` and `destroy()`
//!   each run under a deadline
//! - A module that fails to initialize is destroyed before it is dropped
//! - Teardown empties the maps before destroying so the registry ends up
//!   clear whatever the modules do
//! - Failed modules are not retried

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::time;

use crate::config::ModulesConfig;
use crate::modules::catalog::{is_infrastructure, ModuleCatalog};
use crate::modules::descriptor::{
    DestroyReport, LoadReport, ModuleDescriptor, ModuleStatus, StatusReport, Summary,
};
use crate::modules::error::ModuleError;
use crate::modules::traits::{Module, ModuleContext};
use crate::observability::metrics;

pub struct ModuleRegistry {
    catalog: ModuleCatalog,
    disabled: BTreeSet<String>,
    init_timeout: Duration,
    destroy_timeout: Duration,
    descriptors: RwLock<BTreeMap<String, ModuleDescriptor>>,
}

impl ModuleRegistry {
    pub fn new(catalog: ModuleCatalog, config: &ModulesConfig) -> Self {
        Self {
            catalog,
            disabled: config.disabled.iter().cloned().collect(),
            init_timeout: Duration::from_millis(config.init_timeout_ms),
            destroy_timeout: Duration::from_millis(config.destroy_timeout_ms),
            descriptors: RwLock::new(BTreeMap::new()),
        }
    }

    /// Candidate module names in load order.
    pub fn discover(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .catalog
            .names()
            .filter(|name| !is_infrastructure(name))
            .filter(|name| !self.disabled.contains(*name))
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    /// Construct and initialize every discovered module.
    pub async fn load_all(&self, ctx: &ModuleContext) -> LoadReport {
        if !self.read().is_empty() {
            tracing::warn!("Modules already loaded, destroying previous cycle first");
            self.destroy_all().await;
        }

        let names = self.discover();
        let mut report = LoadReport {
            total: names.len(),
            ..LoadReport::default()
        };
        tracing::info!(total = report.total, "Loading modules");

        for name in names {
            let instance = match self.construct(&name, ctx) {
                Ok(instance) => instance,
                Err(e) => {
                    tracing::error!(module = %name, error = %e, "Module failed to load");
                    self.record(ModuleDescriptor::failed(&name, ModuleStatus::LoadError, e.to_string()));
                    report.failed += 1;
                    continue;
                }
            };
            report.loaded += 1;
            self.record(ModuleDescriptor::loaded(&name, instance.clone()));

            match self.initialize(&instance).await {
                Ok(()) => {
                    tracing::info!(module = %name, "Module ready");
                    self.update(&name, ModuleStatus::Ready, None);
                    report.ready += 1;
                }
                Err(e) => {
                    tracing::error!(module = %name, error = %e, "Module failed to initialize");
                    self.update(&name, ModuleStatus::InitError, Some(e.to_string()));
                    report.failed += 1;
                    // Timers started before the failure must not outlive the instance.
                    if let Err(e) = self.teardown(&instance).await {
                        tracing::warn!(module = %name, error = %e, "Cleanup after failed init failed");
                    }
                }
            }
        }

        tracing::info!(
            total = report.total,
            loaded = report.loaded,
            ready = report.ready,
            failed = report.failed,
            "Module loading complete"
        );
        metrics::record_module_summary(&self.summary());
        report
    }

    /// A ready module by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.read()
            .get(name)
            .filter(|d| d.status == ModuleStatus::Ready)
            .and_then(|d| d.instance.clone())
    }

    pub fn all_statuses(&self) -> BTreeMap<String, StatusReport> {
        self.read()
            .iter()
            .map(|(name, d)| (name.clone(), d.report()))
            .collect()
    }

    pub fn summary(&self) -> Summary {
        let descriptors = self.read();
        Summary {
            total: descriptors.len(),
            ready: descriptors
                .values()
                .filter(|d| d.status == ModuleStatus::Ready)
                .count(),
            errors: descriptors.values().filter(|d| d.status.is_error()).count(),
        }
    }

    /// Destroy every retained instance and clear the registry.
    ///
    /// Safe to call repeatedly and when nothing was loaded. Each `destroy()`
    /// runs under the configured deadline; errors, panics and timeouts are
    /// logged and counted, never propagated.
    pub async fn destroy_all(&self) -> DestroyReport {
        let descriptors = std::mem::take(&mut *self.write());
        let mut report = DestroyReport::default();

        // Reverse load order.
        for (name, descriptor) in descriptors.into_iter().rev() {
            let Some(instance) = descriptor.instance else {
                continue;
            };

            match self.teardown(&instance).await {
                Ok(()) => {
                    tracing::debug!(module = %name, "Module destroyed");
                    report.destroyed += 1;
                }
                Err(e @ ModuleError::Timeout(_)) => {
                    tracing::warn!(module = %name, error = %e, "Module destroy abandoned");
                    report.timed_out += 1;
                }
                Err(e) => {
                    tracing::warn!(module = %name, error = %e, "Module destroy failed");
                    report.failed += 1;
                }
            }
        }

        if report != DestroyReport::default() {
            tracing::info!(
                destroyed = report.destroyed,
                failed = report.failed,
                timed_out = report.timed_out,
                "Modules destroyed"
            );
        }
        metrics::record_module_summary(&Summary::default());
        report
    }

    /// `initialize()` under the init deadline, panics folded into errors.
    async fn initialize(&self, instance: &Arc<dyn Module>) -> Result<(), ModuleError> {
        Self::bounded(self.init_timeout, instance.initialize()).await
    }

    /// `destroy()` under the destroy deadline, panics folded into errors.
    async fn teardown(&self, instance: &Arc<dyn Module>) -> Result<(), ModuleError> {
        Self::bounded(self.destroy_timeout, instance.destroy()).await
    }

    async fn bounded<F>(deadline: Duration, call: F) -> Result<(), ModuleError>
    where
        F: std::future::Future<Output = Result<(), ModuleError>>,
    {
        match time::timeout(deadline, AssertUnwindSafe(call).catch_unwind()).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(ModuleError::from_panic(payload)),
            Err(_) => Err(ModuleError::Timeout(deadline)),
        }
    }

    fn construct(&self, name: &str, ctx: &ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
        let factory = self
            .catalog
            .factory(name)
            .ok_or_else(|| ModuleError::Construction(format!("no factory registered for '{name}'")))?;

        panic::catch_unwind(AssertUnwindSafe(|| factory(ctx)))
            .unwrap_or_else(|payload| Err(ModuleError::from_panic(payload)))
    }

    fn record(&self, descriptor: ModuleDescriptor) {
        self.write().insert(descriptor.name.clone(), descriptor);
    }

    /// Status transitions within a cycle only move forward from `loaded`.
    fn update(&self, name: &str, status: ModuleStatus, error: Option<String>) {
        let mut descriptors = self.write();
        if let Some(d) = descriptors.get_mut(name) {
            debug_assert_eq!(d.status, ModuleStatus::Loaded);
            d.status = status;
            if status.is_error() {
                d.instance = None;
            }
            d.last_error = error;
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, ModuleDescriptor>> {
        self.descriptors.read().expect("module registry lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, ModuleDescriptor>> {
        self.descriptors.write().expect("module registry lock poisoned")
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("catalog", &self.catalog)
            .field("init_timeout", &self.init_timeout)
            .field("destroy_timeout", &self.destroy_timeout)
            .field("summary", &self.summary())
            .finish()
    }
}
