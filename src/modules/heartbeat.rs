//! Built-in liveness module.
//!
//! Counts ticks of a background timer. Its status doubles as a check that the
//! runtime is still scheduling module work.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::modules::error::ModuleError;
use crate::modules::traits::{Module, ModuleContext, ModuleHealth};

pub const NAME: &str = "heartbeat";

const DEFAULT_INTERVAL_MS: u64 = 1_000;

pub struct Heartbeat {
    interval: Duration,
    beats: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Registry factory; reads `interval_ms` from the module settings.
pub fn factory(ctx: &ModuleContext) -> Result<Arc<dyn Module>, ModuleError> {
    let interval_ms = ctx
        .setting::<u64>(NAME, "interval_ms")
        .unwrap_or(DEFAULT_INTERVAL_MS);
    if interval_ms == 0 {
        return Err(ModuleError::Construction("interval_ms must be > 0".into()));
    }
    Ok(Arc::new(Heartbeat::new(Duration::from_millis(interval_ms))))
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            beats: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    fn is_running(&self) -> bool {
        self.task
            .lock()
            .expect("heartbeat mutex poisoned")
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

#[async_trait]
impl Module for Heartbeat {
    fn name(&self) -> &str {
        NAME
    }

    async fn initialize(&self) -> Result<(), ModuleError> {
        let mut task = self.task.lock().expect("heartbeat mutex poisoned");
        if task.is_some() {
            return Ok(());
        }

        let beats = self.beats.clone();
        let mut ticker = tokio::time::interval(self.interval);
        *task = Some(tokio::spawn(async move {
            ticker.tick().await;
            loop {
                ticker.tick().await;
                beats.fetch_add(1, Ordering::Relaxed);
            }
        }));
        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "Heartbeat started");
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ModuleError> {
        if let Some(task) = self.task.lock().expect("heartbeat mutex poisoned").take() {
            task.abort();
        }
        Ok(())
    }

    fn status(&self) -> Value {
        json!({
            "beats": self.beats(),
            "interval_ms": self.interval.as_millis() as u64,
            "running": self.is_running(),
        })
    }

    fn health(&self) -> ModuleHealth {
        let detail = json!({ "beats": self.beats() });
        if self.is_running() {
            ModuleHealth::healthy(detail)
        } else {
            ModuleHealth::unhealthy(detail)
        }
    }
}
