//! Module lifecycle errors.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

/// A failure in one module's lifecycle.
///
/// Recorded on the module's descriptor; never aborts a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    #[error("construction failed: {0}")]
    Construction(String),

    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("destroy failed: {0}")]
    Destroy(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("panicked: {0}")]
    Panicked(String),
}

impl ModuleError {
    /// Build a [`ModuleError::Panicked`] from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payloads() {
        let err = ModuleError::from_panic(Box::new("boom"));
        assert_eq!(err, ModuleError::Panicked("boom".into()));

        let err = ModuleError::from_panic(Box::new(String::from("kaboom")));
        assert_eq!(err.to_string(), "panicked: kaboom");

        let err = ModuleError::from_panic(Box::new(42u8));
        assert_eq!(err, ModuleError::Panicked("non-string panic payload".into()));
    }
}
