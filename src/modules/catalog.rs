//! Compile-time module registration table.
//!
//! Discovery iterates this table instead of scanning a directory. Names on
//! the infrastructure deny-list are never offered for loading even if
//! registered.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::modules::error::ModuleError;
use crate::modules::heartbeat;
use crate::modules::traits::{Module, ModuleContext, ModuleFactory};

/// Names reserved for kernel infrastructure.
pub const DENY_LIST: &[&str] = &[
    "module-registry",
    "server",
    "security-gateway",
    "performance-monitor",
];

/// Whether `name` belongs to the kernel or a test harness rather than a
/// feature module.
pub fn is_infrastructure(name: &str) -> bool {
    DENY_LIST.contains(&name) || name.starts_with("test-") || name.ends_with("-test")
}

/// Registered module factories, ordered by name.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    factories: BTreeMap<String, ModuleFactory>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The modules shipped with the kernel.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(heartbeat::NAME, heartbeat::factory);
        catalog
    }

    /// Register a factory. The first registration of a name wins.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&ModuleContext) -> Result<Arc<dyn Module>, ModuleError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            tracing::warn!(module = %name, "Duplicate module registration ignored");
        } else {
            self.factories.insert(name, Arc::new(factory));
        }
        self
    }

    pub fn factory(&self, name: &str) -> Option<&ModuleFactory> {
        self.factories.get(name)
    }

    /// All registered names in lexicographic order, deny-listed ones included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}
