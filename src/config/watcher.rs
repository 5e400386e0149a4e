//! Hot reload of the configuration file.
//!
//! # Design Decisions
//! - The parent directory is watched, not the file, so editors and deploy
//!   tools that replace the file by rename keep being seen
//! - Events for other files in that directory are ignored
//! - Only configurations that parse, validate and differ from the last one
//!   forwarded are sent on

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::KernelConfig;

/// Watches one configuration file and forwards validated changes.
pub struct ConfigWatcher {
    path: PathBuf,
    current: KernelConfig,
    update_tx: mpsc::UnboundedSender<KernelConfig>,
}

impl ConfigWatcher {
    /// `current` is the configuration already in effect; reloads equal to it
    /// are dropped.
    pub fn new(
        path: &Path,
        current: KernelConfig,
    ) -> (Self, mpsc::UnboundedReceiver<KernelConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Updates stop when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut current,
            update_tx,
        } = self;

        let file_name = path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| notify::Error::generic("config path has no file name"))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let watched = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if concerns(&event, &file_name) => {
                    if let Some(next) = reload(&watched, &mut current) {
                        if update_tx.send(next).is_err() {
                            tracing::debug!("Config update receiver dropped");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

fn concerns(event: &Event, file_name: &OsString) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

/// Load `path` and return it if it is valid and differs from `current`.
fn reload(path: &Path, current: &mut KernelConfig) -> Option<KernelConfig> {
    match load_config(path) {
        Ok(next) if next == *current => {
            tracing::debug!(path = ?path, "Config file touched without changes");
            None
        }
        Ok(next) => {
            tracing::info!(path = ?path, "Config file changed, reloading");
            *current = next.clone();
            Some(next)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current policy");
            None
        }
    }
}
