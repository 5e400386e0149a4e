//! The capability set every feature module exposes to the registry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ModulesConfig;
use crate::modules::error::ModuleError;

/// A feature module managed by the registry.
///
/// Methods take `&self`; modules keep mutable state behind their own locks so
/// the registry can hand out shared handles to route handlers.
#[async_trait]
pub trait Module: Send + Sync {
    /// Registered name.
    fn name(&self) -> &str;

    /// Bring the module up. May start background work.
    async fn initialize(&self) -> Result<(), ModuleError>;

    /// Stop background work and release resources. Called at most once per
    /// load cycle, possibly under a deadline.
    async fn destroy(&self) -> Result<(), ModuleError>;

    /// Module-defined status document.
    fn status(&self) -> Value;

    fn health(&self) -> ModuleHealth;
}

/// Health as reported by a module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleHealth {
    pub healthy: bool,
    pub detail: Value,
}

impl ModuleHealth {
    pub fn healthy(detail: Value) -> Self {
        Self {
            healthy: true,
            detail,
        }
    }

    pub fn unhealthy(detail: Value) -> Self {
        Self {
            healthy: false,
            detail,
        }
    }
}

/// The single dependency handed to every module factory.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub kernel_version: &'static str,
    pub started_at: Instant,
    settings: BTreeMap<String, Value>,
}

impl ModuleContext {
    pub fn new(settings: BTreeMap<String, Value>) -> Self {
        Self {
            kernel_version: env!("CARGO_PKG_VERSION"),
            started_at: Instant::now(),
            settings,
        }
    }

    /// Context carrying the `[modules.settings.*]` tables.
    pub fn from_config(config: &ModulesConfig) -> Self {
        let settings = config
            .settings
            .iter()
            .filter_map(|(name, table)| match serde_json::to_value(table) {
                Ok(value) => Some((name.clone(), value)),
                Err(e) => {
                    tracing::warn!(module = %name, error = %e, "Ignoring unrepresentable module settings");
                    None
                }
            })
            .collect();
        Self::new(settings)
    }

    /// The whole settings table for a module.
    pub fn settings_for(&self, module: &str) -> Option<&Value> {
        self.settings.get(module)
    }

    /// One typed setting, `None` when absent or of the wrong shape.
    pub fn setting<T: DeserializeOwned>(&self, module: &str, key: &str) -> Option<T> {
        self.settings_for(module)
            .and_then(|table| table.get(key))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

impl Default for ModuleContext {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

/// Constructs a module from the shared context.
pub type ModuleFactory =
    Arc<dyn Fn(&ModuleContext) -> Result<Arc<dyn Module>, ModuleError> + Send + Sync>;
