//! Template file watcher for forced reloads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::lifecycle::signals::ControlEvent;

/// Monitors the config template and asks the controller to re-render when it changes.
pub struct TemplateWatcher {
    path: PathBuf,
    events: mpsc::UnboundedSender<ControlEvent>,
}

impl TemplateWatcher {
    /// Create a watcher that reports into the controller's event channel.
    pub fn new(path: &Path, events: mpsc::UnboundedSender<ControlEvent>) -> Self {
        Self {
            path: path.to_path_buf(),
            events,
        }
    }

    /// Start watching in a background thread.
    ///
    /// The parent directory is watched so editors that replace the file by
    /// rename are still picked up. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.events.clone();
        let target = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if touches(&event, &target) {
                        tracing::info!(path = ?target, "Template change detected, requesting reload");
                        let _ = tx.send(ControlEvent::Reload);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Template watcher started");
        Ok(watcher)
    }
}

fn touches(event: &Event, target: &Path) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|p| p.file_name().is_some() && p.file_name() == target.file_name())
}
