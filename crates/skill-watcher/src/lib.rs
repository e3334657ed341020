//! Filesystem watcher: debounces native change events and publishes a
//! single `file.changed` event per settled burst, falling back to
//! interval polling when the native backend can't be initialized (e.g.
//! an exhausted inotify instance limit).

#![warn(missing_docs)]

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use skill_reactor::{Reactor, Topic};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Paths and filename patterns the watcher never reports changes for.
pub fn is_denied(path: &Path) -> bool {
    let denied_dirs = ["target", "node_modules", "__pycache__", ".git", ".hg", ".svn"];
    if path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| denied_dirs.contains(&s))
            .unwrap_or(false)
    }) {
        return true;
    }
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) if name.ends_with(".swp") || name.ends_with('~') => true,
        Some(name) if name.starts_with(".#") => true,
        _ => false,
    }
}

/// Configuration for a watch session.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Time to wait after the last event in a burst before publishing.
    pub debounce: Duration,
    /// Poll interval used only when the native backend fails to init.
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Watches `root` for changes, debouncing bursts and publishing
/// `Topic::FileChanged` events to `reactor`. Runs until the returned
/// task is aborted or the process exits.
pub async fn watch(root: PathBuf, reactor: Reactor, config: WatcherConfig) {
    let (tx, mut rx) = mpsc::channel(256);

    let watcher_result: notify::Result<RecommendedWatcher> =
        notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        });

    match watcher_result {
        Ok(mut watcher) => {
            if let Err(e) = watcher.watch(&root, RecursiveMode::Recursive) {
                warn!(error = %e, "failed to start native watcher, falling back to polling");
                poll_loop(root, reactor, config).await;
                return;
            }
            // Keep the watcher alive for the duration of this future.
            std::mem::forget(watcher);
            debounce_loop(&mut rx, reactor, config).await;
        }
        Err(e) => {
            warn!(error = %e, "failed to initialize native watcher, falling back to polling");
            poll_loop(root, reactor, config).await;
        }
    }
}

async fn debounce_loop(rx: &mut mpsc::Receiver<notify::Event>, reactor: Reactor, config: WatcherConfig) {
    let mut pending: HashSet<PathBuf> = HashSet::new();
    loop {
        let first = match rx.recv().await {
            Some(event) => event,
            None => return,
        };
        pending.extend(first.paths.iter().filter(|p| !is_denied(p)).cloned());

        loop {
            match tokio::time::timeout(config.debounce, rx.recv()).await {
                Ok(Some(event)) => {
                    pending.extend(event.paths.iter().filter(|p| !is_denied(p)).cloned());
                }
                _ => break,
            }
        }

        if !pending.is_empty() {
            info!(count = pending.len(), "publishing debounced file changes");
            let paths: Vec<String> = pending.drain().map(|p| p.display().to_string()).collect();
            reactor
                .publish(Topic::FileChanged, serde_json::json!({"paths": paths}), None)
                .await;
        }
    }
}

async fn poll_loop(root: PathBuf, reactor: Reactor, config: WatcherConfig) {
    let mut known: HashSet<PathBuf> = HashSet::new();
    loop {
        tokio::time::sleep(config.poll_interval).await;
        let mut current = HashSet::new();
        for entry in walkdir::WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && !is_denied(entry.path()) {
                current.insert(entry.path().to_path_buf());
            }
        }
        let changed: Vec<_> = current.symmetric_difference(&known).cloned().collect();
        if !changed.is_empty() {
            let paths: Vec<String> = changed.iter().map(|p| p.display().to_string()).collect();
            reactor
                .publish(Topic::FileChanged, serde_json::json!({"paths": paths}), None)
                .await;
        }
        known = current;
    }
}
