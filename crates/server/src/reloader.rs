//! Script folder watcher
//!
//! Collects file system events for the script folder on a background
//! thread; the world loop drains them once per tick and reloads when a
//! script file changed.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver};

pub struct ScriptReloader {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
}

impl ScriptReloader {
    pub fn new(root: &Path) -> Result<Self> {
        if !root.exists() {
            anyhow::bail!("script folder `{}` does not exist", root.display());
        }

        let (tx, rx) = channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .context("create script watcher")?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("watch {}", root.display()))?;

        tracing::info!("Watching `{}` for script changes", root.display());
        Ok(Self { _watcher: watcher, rx })
    }

    /// Drain pending events; true when any script file changed
    pub fn has_changes(&self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(event) if is_script_change(&event) => {
                    tracing::debug!("Script change: {:?}", event.paths);
                    changed = true;
                }
                Ok(_) => {}
                Err(err) => tracing::warn!("Script watcher error: {}", err),
            }
        }
        changed
    }
}

fn is_script_change(event: &Event) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    relevant_kind
        && event.paths.iter().any(|path| {
            matches!(path.extension().and_then(|ext| ext.to_str()), Some("lua") | Some("ext"))
        })
}
