use crate::core::app_log::AppLog;
use crate::core::change_watcher::ChangeWatcher;
use crate::core::dispatcher::NotificationDispatcher;
use crate::core::metadata_index::GameMetadataIndex;
use crate::core::notifier::DesktopNotifier;
use crate::core::progress_store::ProgressStore;
use crate::models::Settings;
use anyhow::Context;
use serde_json::json;
use std::sync::mpsc;

const SCOPE: &str = "watch";

pub fn run(settings: &Settings, log: &AppLog) -> anyhow::Result<()> {
    log.info(
        SCOPE,
        "startup",
        Some(json!({
            "local_root": settings.local_root,
            "library_roots": settings.library_roots,
            "language": settings.language,
            "sound": settings.sound,
        })),
    );

    let index = GameMetadataIndex::new(settings.library_roots.clone());
    let progress = ProgressStore::initialize(&settings.local_root, &index, log).with_context(|| {
        format!(
            "Failed to scan local achievements in {}",
            settings.local_root.display()
        )
    })?;
    log.info(SCOPE, "index_built", Some(json!({ "tracked_games": progress.len() })));

    let notifier = DesktopNotifier::new(settings.app_name.clone(), settings.sound.clone(), log.clone());
    match notifier.configure_once() {
        Ok(()) => log.info("notifications/native", "configured", None),
        Err(e) => log.error(
            "notifications/native",
            "configure_failed",
            Some(json!({ "error": e.to_string() })),
        ),
    }

    let mut dispatcher =
        NotificationDispatcher::new(index, progress, settings.language.clone(), notifier, log.clone());
    let watcher = ChangeWatcher::start(
        &settings.local_root,
        move |event| {
            dispatcher.handle(&event);
        },
        log.clone(),
    )
    .with_context(|| format!("Failed to watch {}", settings.local_root.display()))?;

    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    println!(
        "Watching {} for new achievements. Press Ctrl-C to quit.",
        settings.local_root.display()
    );
    let _ = stop_rx.recv();

    // Stop producing events before anything they touch goes away.
    log.info(SCOPE, "stopping", None);
    watcher.stop();
    log.info(SCOPE, "stopped", None);
    Ok(())
}
