//! Serving a started kernel until it is told to stop.
//!
//! Every way out, including a failed bind or a server task that dies on its
//! own, ends in [`Kernel::shutdown`].

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinError;

use crate::config::watcher::ConfigWatcher;
use crate::config::KernelConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::startup::Kernel;
use crate::modules::DestroyReport;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config watcher failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("listener failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP server task panicked: {0}")]
    ServerPanicked(#[from] JoinError),
}

/// Serve `kernel` until `stop` resolves, then tear it down.
///
/// With `watch`, the file at that path is hot-reloaded; the config is the one
/// it was last loaded as. The kernel is shut down whether serving ends
/// cleanly or not.
pub async fn run_until<F>(
    kernel: Arc<Kernel>,
    watch: Option<(&Path, KernelConfig)>,
    stop: F,
) -> Result<DestroyReport, RunError>
where
    F: Future<Output = ()>,
{
    let outcome = serve(&kernel, watch, stop).await;
    if let Err(e) = &outcome {
        tracing::error!(error = %e, "Kernel stopping after failure");
    }

    let report = kernel.shutdown().await;
    tracing::info!(
        destroyed = report.destroyed,
        failed = report.failed,
        timed_out = report.timed_out,
        "Shutdown complete"
    );
    outcome.map(|()| report)
}

async fn serve<F>(
    kernel: &Arc<Kernel>,
    watch: Option<(&Path, KernelConfig)>,
    stop: F,
) -> Result<(), RunError>
where
    F: Future<Output = ()>,
{
    // Updates stop when this is dropped.
    let _watcher = match watch {
        Some((path, current)) => {
            let (watcher, mut updates) = ConfigWatcher::new(path, current);
            let watcher = watcher.run()?;
            let kernel = kernel.clone();
            tokio::spawn(async move {
                while let Some(next) = updates.recv().await {
                    kernel.apply_config(&next);
                }
            });
            Some(watcher)
        }
        None => None,
    };

    let config = kernel.config().clone();
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, kernel);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let early_exit = tokio::select! {
        finished = &mut server_task => Some(finished),
        _ = stop => None,
    };
    let finished = match early_exit {
        Some(finished) => {
            tracing::warn!("HTTP server exited before a stop was requested");
            finished
        }
        None => {
            shutdown.trigger();
            server_task.await
        }
    };

    finished??;
    Ok(())
}
