use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Wake-ups for the `tail --follow` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailEvent {
    LogChanged,
    Tick,
}

/// Spawn a tick timer that sends Tick events at the given interval.
pub fn spawn_tick_timer(tx: mpsc::Sender<TailEvent>, interval: Duration) {
    std::thread::spawn(move || loop {
        std::thread::sleep(interval);
        if tx.send(TailEvent::Tick).is_err() {
            break;
        }
    });
}

/// Watch a session directory and signal whenever its structured log grows.
/// The returned watcher must be kept alive for events to keep flowing.
pub fn watch_session(dir: &Path, tx: mpsc::Sender<TailEvent>) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
        if let Ok(event) = res {
            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                && event
                    .paths
                    .iter()
                    .any(|p| p.extension().and_then(|e| e.to_str()) == Some("jsonl"))
            {
                let _ = tx.send(TailEvent::LogChanged);
            }
        }
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
