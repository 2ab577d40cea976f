use crate::core::app_log::AppLog;
use crate::core::error::{Result, WatchdogError};
use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

const SCOPE: &str = "watcher";

/// A created or modified path below the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub is_dir: bool,
}

enum Message {
    Fs(notify::Result<Event>),
    Stop,
}

/// Recursive create/modify subscription on one root.
///
/// Events are handed to the handler one at a time on a single worker thread,
/// so the handler can own its state without locking. No debouncing happens
/// here.
pub struct ChangeWatcher {
    watcher: Option<RecommendedWatcher>,
    tx: Sender<Message>,
    worker: Option<JoinHandle<()>>,
}

pub(crate) fn change_events(event: &Event) -> Vec<ChangeEvent> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return Vec::new();
    }
    let created_folder = matches!(event.kind, EventKind::Create(CreateKind::Folder));
    event
        .paths
        .iter()
        .map(|path| ChangeEvent {
            path: path.clone(),
            is_dir: created_folder || path.is_dir(),
        })
        .collect()
}

impl ChangeWatcher {
    /// Fails when the subscription cannot be established, e.g. a missing root.
    pub fn start<F>(root: &Path, mut handler: F, log: AppLog) -> Result<Self>
    where
        F: FnMut(ChangeEvent) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Message>();

        let fs_tx = tx.clone();
        let mut watcher = notify::recommended_watcher(move |result| {
            let _ = fs_tx.send(Message::Fs(result));
        })
        .map_err(|source| WatchdogError::Watch {
            path: root.to_path_buf(),
            source,
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchdogError::Watch {
                path: root.to_path_buf(),
                source,
            })?;

        let worker = std::thread::Builder::new()
            .name("change-watcher".to_string())
            .spawn(move || {
                while let Ok(message) = rx.recv() {
                    match message {
                        Message::Fs(Ok(event)) => {
                            for change in change_events(&event) {
                                handler(change);
                            }
                        }
                        Message::Fs(Err(e)) => {
                            log.warn(SCOPE, "watch_error", Some(json!({ "error": e.to_string() })));
                        }
                        Message::Stop => break,
                    }
                }
            })
            .map_err(|e| WatchdogError::io(root, e))?;

        Ok(Self {
            watcher: Some(watcher),
            tx,
            worker: Some(worker),
        })
    }

    /// Unsubscribes, lets the worker finish the events already queued, and
    /// waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.watcher.take());
        let _ = self.tx.send(Message::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
