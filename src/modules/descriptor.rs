//! Per-module bookkeeping and the reports built from it.

use std::sync::Arc;

use serde::Serialize;

use crate::modules::traits::Module;

/// Where a module stands in the current load cycle.
///
/// ```text
/// undiscovered → loaded → ready
///                       ↘ init-error
///              ↘ load-error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleStatus {
    Loaded,
    Ready,
    LoadError,
    InitError,
}

impl ModuleStatus {
    pub fn is_error(self) -> bool {
        matches!(self, Self::LoadError | Self::InitError)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Ready => "ready",
            Self::LoadError => "load-error",
            Self::InitError => "init-error",
        }
    }
}

/// Registry entry for one discovered module.
pub struct ModuleDescriptor {
    pub name: String,
    pub status: ModuleStatus,
    pub last_error: Option<String>,
    /// Present only while the module is ready.
    pub instance: Option<Arc<dyn Module>>,
}

impl ModuleDescriptor {
    pub fn loaded(name: &str, instance: Arc<dyn Module>) -> Self {
        Self {
            name: name.to_string(),
            status: ModuleStatus::Loaded,
            last_error: None,
            instance: Some(instance),
        }
    }

    pub fn failed(name: &str, status: ModuleStatus, error: String) -> Self {
        Self {
            name: name.to_string(),
            status,
            last_error: Some(error),
            instance: None,
        }
    }

    pub fn report(&self) -> StatusReport {
        StatusReport {
            status: self.status,
            error: self.last_error.clone(),
        }
    }
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("status", &self.status)
            .field("last_error", &self.last_error)
            .field("has_instance", &self.instance.is_some())
            .finish()
    }
}

/// Diagnostic view of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: ModuleStatus,
    pub error: Option<String>,
}

/// Outcome of `load_all`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Modules discovered.
    pub total: usize,
    /// Modules whose construction succeeded.
    pub loaded: usize,
    pub ready: usize,
    /// Load and init errors.
    pub failed: usize,
}

/// Counts over the current statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub ready: usize,
    pub errors: usize,
}

/// Outcome of `destroy_all`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DestroyReport {
    pub destroyed: usize,
    pub failed: usize,
    pub timed_out: usize,
}
