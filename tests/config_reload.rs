//! File-driven hot reload through a live watcher.

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use platform_kernel::config::watcher::ConfigWatcher;
use platform_kernel::config::{load_config, KernelConfig};

/// Replace the file by rename, the way deploy tools do.
fn replace(path: &Path, content: &str) {
    let staged = path.with_extension("toml.new");
    std::fs::write(&staged, content).unwrap();
    std::fs::rename(&staged, path).unwrap();
}

fn limit(n: u32) -> String {
    format!("[security]\nmax_requests_per_minute = {n}\n")
}

async fn next_update(updates: &mut UnboundedReceiver<KernelConfig>) -> KernelConfig {
    timeout(Duration::from_secs(10), updates.recv())
        .await
        .expect("no config update arrived")
        .expect("watcher channel closed")
}

#[tokio::test]
async fn test_only_valid_changes_are_forwarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kernel.toml");
    std::fs::write(&path, limit(100)).unwrap();
    let initial = load_config(&path).unwrap();

    let (watcher, mut updates) = ConfigWatcher::new(&path, initial);
    let _watcher = watcher.run().unwrap();

    replace(&path, &limit(42));
    assert_eq!(next_update(&mut updates).await.security.max_requests_per_minute, 42);

    replace(&path, &limit(0));
    replace(&path, &limit(7));
    assert_eq!(next_update(&mut updates).await.security.max_requests_per_minute, 7);

    // Unrelated files in the same directory are not reloads.
    std::fs::write(dir.path().join("other.toml"), limit(3)).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn test_rewrite_with_same_content_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kernel.toml");
    std::fs::write(&path, limit(50)).unwrap();

    let (watcher, mut updates) = ConfigWatcher::new(&path, load_config(&path).unwrap());
    let _watcher = watcher.run().unwrap();

    replace(&path, &limit(50));
    replace(&path, &limit(51));
    assert_eq!(next_update(&mut updates).await.security.max_requests_per_minute, 51);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(updates.try_recv().is_err());
}
