use crate::core::app_log::AppLog;
use crate::core::change_watcher::ChangeEvent;
use crate::core::error::WatchdogError;
use crate::core::metadata_index::GameMetadataIndex;
use crate::core::notifier::NotificationSink;
use crate::core::progress_store::ProgressStore;
use crate::core::save_files::{is_local_record_file, load_definitions, load_local_records};
use crate::models::{AchievementDefinition, LocalAchievementRecord, NotificationRequest};
use serde_json::json;
use std::path::Path;

const SCOPE: &str = "dispatch";

/// What a single filesystem event led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a local record file.
    Ignored,
    /// The save folder has no marker yet; the next event retries.
    Unresolved,
    /// The record or definition file could not be read; the watermark is untouched.
    Unreadable,
    /// Nothing earned after the watermark.
    NothingNew,
    Notified {
        notified: usize,
        skipped: usize,
        watermark: u64,
    },
}

/// Turns record-file changes into one notification per newly earned achievement.
///
/// Owns the folder cache and watermarks exclusively. Events must be fed one
/// at a time, which [`ChangeWatcher`](crate::core::change_watcher::ChangeWatcher)
/// guarantees.
pub struct NotificationDispatcher<S: NotificationSink> {
    index: GameMetadataIndex,
    progress: ProgressStore,
    language: String,
    sink: S,
    log: AppLog,
}

fn folder_name(path: &Path) -> Option<String> {
    path.parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
}

fn build_request(
    definition: &AchievementDefinition,
    definitions_file: &Path,
    language: &str,
) -> NotificationRequest {
    let icon = definition.icon.as_deref().filter(|s| !s.trim().is_empty()).map(|rel| {
        definitions_file
            .parent()
            .map(|dir| dir.join(rel))
            .unwrap_or_else(|| rel.into())
    });
    NotificationRequest {
        title: definition.title(language).to_string(),
        body: definition.body(language).to_string(),
        icon,
    }
}

impl<S: NotificationSink> NotificationDispatcher<S> {
    pub fn new(
        index: GameMetadataIndex,
        progress: ProgressStore,
        language: impl Into<String>,
        sink: S,
        log: AppLog,
    ) -> Self {
        Self {
            index,
            progress,
            language: language.into(),
            sink,
            log,
        }
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn handle(&mut self, event: &ChangeEvent) -> DispatchOutcome {
        if event.is_dir || !is_local_record_file(&event.path) {
            return DispatchOutcome::Ignored;
        }
        let Some(folder) = folder_name(&event.path) else {
            return DispatchOutcome::Ignored;
        };

        self.log.info(
            SCOPE,
            "record_changed",
            Some(json!({ "path": event.path, "folder": folder })),
        );

        if self.progress.get(&folder).is_none() {
            self.log.info(SCOPE, "resolve_attempt", Some(json!({ "folder": folder })));
            match self.index.resolve(&folder) {
                Ok(entry) => {
                    self.log.info(
                        SCOPE,
                        "resolved",
                        Some(json!({
                            "folder": folder,
                            "achievements_file": entry.achievements_file,
                        })),
                    );
                    self.progress.track(&folder, entry.achievements_file);
                }
                Err(e) => {
                    self.log.error(
                        SCOPE,
                        "unresolved",
                        Some(json!({ "folder": folder, "error": e.to_string() })),
                    );
                    return DispatchOutcome::Unresolved;
                }
            }
        }
        let Some(game) = self.progress.get(&folder).cloned() else {
            return DispatchOutcome::Unresolved;
        };

        let records = match load_local_records(&event.path) {
            Ok(records) => records,
            Err(e) => {
                self.log.error(
                    SCOPE,
                    "record_unreadable",
                    Some(json!({ "folder": folder, "error": e.to_string() })),
                );
                return DispatchOutcome::Unreadable;
            }
        };

        let fresh: Vec<LocalAchievementRecord> = records
            .into_iter()
            .filter(|r| r.earned && r.earned_time_unix > game.last_notified_earned_time)
            .collect();
        let Some(batch_max) = fresh.iter().map(|r| r.earned_time_unix).max() else {
            return DispatchOutcome::NothingNew;
        };

        let definitions = match load_definitions(&game.achievements_file) {
            Ok(definitions) => definitions,
            Err(e) => {
                self.log.error(
                    SCOPE,
                    "definitions_unreadable",
                    Some(json!({ "folder": folder, "error": e.to_string() })),
                );
                return DispatchOutcome::Unreadable;
            }
        };

        let mut requests = Vec::with_capacity(fresh.len());
        let mut skipped = 0;
        for record in &fresh {
            match definitions.iter().find(|d| d.name == record.name) {
                Some(definition) => requests.push(build_request(
                    definition,
                    &game.achievements_file,
                    &self.language,
                )),
                None => {
                    skipped += 1;
                    let e = WatchdogError::UnmatchedAchievement(record.name.clone());
                    self.log.warn(
                        SCOPE,
                        "unmatched_achievement",
                        Some(json!({ "folder": folder, "error": e.to_string() })),
                    );
                }
            }
        }

        // Unmatched records are covered too, so they are not picked up again.
        let watermark = self
            .progress
            .record_notified(&folder, batch_max)
            .unwrap_or(batch_max);

        let notified = requests.len();
        for request in &requests {
            match self.sink.show(request) {
                Ok(()) => self.log.info(
                    SCOPE,
                    "notification_sent",
                    Some(json!({
                        "folder": folder,
                        "title": request.title,
                        "body": request.body,
                        "icon": request.icon,
                    })),
                ),
                Err(e) => self.log.error(
                    SCOPE,
                    "notification_failed",
                    Some(json!({ "folder": folder, "title": request.title, "error": e.to_string() })),
                ),
            }
        }

        DispatchOutcome::Notified {
            notified,
            skipped,
            watermark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Result;
    use crate::core::save_files::{ACHIEVEMENTS_FILE_NAME, MARKER_FILE_NAME};
    use crate::models::achievements::TITLE_PLACEHOLDER;
    use parking_lot::Mutex;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct RecordingSink {
        shown: Arc<Mutex<Vec<NotificationRequest>>>,
        fail: bool,
    }

    impl RecordingSink {
        fn titles(&self) -> Vec<String> {
            self.shown.lock().iter().map(|r| r.title.clone()).collect()
        }
    }

    impl NotificationSink for RecordingSink {
        fn show(&self, request: &NotificationRequest) -> Result<()> {
            self.shown.lock().push(request.clone());
            if self.fail {
                return Err(WatchdogError::Sink("daemon unavailable".to_string()));
            }
            Ok(())
        }
    }

    struct Env {
        _dirs: Vec<tempfile::TempDir>,
        local_root: PathBuf,
        library_root: PathBuf,
        log: AppLog,
    }

    impl Env {
        fn new() -> Self {
            let dirs: Vec<tempfile::TempDir> =
                (0..3).map(|_| tempfile::tempdir().expect("tempdir")).collect();
            let log = AppLog::open(dirs[2].path()).expect("log");
            Self {
                local_root: dirs[0].path().to_path_buf(),
                library_root: dirs[1].path().to_path_buf(),
                log,
                _dirs: dirs,
            }
        }

        fn add_game(&self, id: &str, definitions: &str) -> PathBuf {
            let dir = self.library_root.join(format!("Game {id}")).join("steam_settings");
            fs::create_dir_all(&dir).expect("mkdir");
            fs::write(dir.join(MARKER_FILE_NAME), id).expect("marker");
            fs::write(dir.join(ACHIEVEMENTS_FILE_NAME), definitions).expect("definitions");
            dir
        }

        fn write_save(&self, id: &str, body: &str) -> ChangeEvent {
            let dir = self.local_root.join(id);
            fs::create_dir_all(&dir).expect("mkdir");
            let path = dir.join(ACHIEVEMENTS_FILE_NAME);
            fs::write(&path, body).expect("save");
            ChangeEvent { path, is_dir: false }
        }

        fn index(&self) -> GameMetadataIndex {
            GameMetadataIndex::new(vec![self.library_root.clone()])
        }

        fn dispatcher(&self, sink: RecordingSink) -> NotificationDispatcher<RecordingSink> {
            let progress =
                ProgressStore::initialize(&self.local_root, &self.index(), &self.log).expect("init");
            NotificationDispatcher::new(self.index(), progress, "english", sink, self.log.clone())
        }

        fn errors(&self) -> Vec<String> {
            self.log
                .read(1000, None)
                .expect("read log")
                .into_iter()
                .filter(|r| r.level == "error")
                .map(|r| r.message)
                .collect()
        }
    }

    const DEFINITIONS: &str = r#"[
        {"name":"A","displayName":{"english":"Alpha","german":"Alfa"},"description":{"english":"First one"},"hidden":0,"icon":"img/a.jpg"},
        {"name":"B","displayName":{"english":"Beta"},"description":{"english":"Second one"},"hidden":1},
        {"name":"C","displayName":{"german":"Gamma"},"description":{},"hidden":0}
    ]"#;

    fn save(entries: &[(&str, bool, u64)]) -> String {
        let map: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(name, earned, time)| {
                (
                    name.to_string(),
                    json!({ "earned": earned, "earned_time": time }),
                )
            })
            .collect();
        serde_json::Value::Object(map).to_string()
    }

    #[test]
    fn new_batch_is_notified_and_watermark_advances() {
        let env = Env::new();
        let game_dir = env.add_game("480", DEFINITIONS);
        env.write_save("480", &save(&[("A", false, 0)]));

        let sink = RecordingSink::default();
        let mut dispatcher = env.dispatcher(sink.clone());
        assert_eq!(dispatcher.progress().get("480").map(|g| g.last_notified_earned_time), Some(0));

        let event = env.write_save("480", &save(&[("A", true, 100), ("B", true, 200)]));
        assert_eq!(
            dispatcher.handle(&event),
            DispatchOutcome::Notified { notified: 2, skipped: 0, watermark: 200 }
        );

        let shown = sink.shown.lock().clone();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].title, "Alpha");
        assert_eq!(shown[0].body, "First one");
        assert_eq!(shown[0].icon, Some(game_dir.join("img/a.jpg")));
        assert_eq!(shown[1].title, "Beta");
        assert_eq!(shown[1].icon, None);

        assert_eq!(dispatcher.handle(&event), DispatchOutcome::NothingNew);
        assert_eq!(sink.shown.lock().len(), 2);
    }

    #[test]
    fn startup_state_is_not_announced_again() {
        let env = Env::new();
        env.add_game("480", DEFINITIONS);
        let event = env.write_save("480", &save(&[("A", true, 100), ("B", true, 200)]));

        let sink = RecordingSink::default();
        let mut dispatcher = env.dispatcher(sink.clone());
        assert_eq!(dispatcher.handle(&event), DispatchOutcome::NothingNew);

        let event = env.write_save("480", &save(&[("A", true, 100), ("B", true, 200), ("C", true, 300)]));
        assert_eq!(
            dispatcher.handle(&event),
            DispatchOutcome::Notified { notified: 1, skipped: 0, watermark: 300 }
        );
        assert_eq!(sink.titles(), [TITLE_PLACEHOLDER]);
    }

    #[test]
    fn unresolved_folder_is_added_once_marker_appears() {
        let env = Env::new();
        let sink = RecordingSink::default();
        let mut dispatcher = env.dispatcher(sink.clone());

        let event = env.write_save("620", &save(&[("A", true, 100)]));
        assert_eq!(dispatcher.handle(&event), DispatchOutcome::Unresolved);
        assert!(dispatcher.progress().get("620").is_none());
        assert!(sink.titles().is_empty());
        assert_eq!(env.errors(), ["unresolved"]);

        env.add_game("620", DEFINITIONS);
        assert_eq!(
            dispatcher.handle(&event),
            DispatchOutcome::Notified { notified: 1, skipped: 0, watermark: 100 }
        );
        assert_eq!(sink.titles(), ["Alpha"]);
    }

    #[test]
    fn missing_definitions_leave_watermark_for_retry() {
        let env = Env::new();
        let game_dir = env.add_game("480", DEFINITIONS);
        env.write_save("480", &save(&[]));
        fs::remove_file(game_dir.join(ACHIEVEMENTS_FILE_NAME)).expect("remove");

        let sink = RecordingSink::default();
        let mut dispatcher = env.dispatcher(sink.clone());
        let event = env.write_save("480", &save(&[("A", true, 100)]));

        assert_eq!(dispatcher.handle(&event), DispatchOutcome::Unreadable);
        assert!(sink.titles().is_empty());
        assert_eq!(dispatcher.progress().get("480").map(|g| g.last_notified_earned_time), Some(0));
        assert_eq!(env.errors(), ["definitions_unreadable"]);

        fs::write(game_dir.join(ACHIEVEMENTS_FILE_NAME), DEFINITIONS).expect("restore");
        assert_eq!(
            dispatcher.handle(&event),
            DispatchOutcome::Notified { notified: 1, skipped: 0, watermark: 100 }
        );
    }

    #[test]
    fn corrupt_record_file_is_dropped() {
        let env = Env::new();
        env.add_game("480", DEFINITIONS);
        env.write_save("480", &save(&[("A", true, 100)]));

        let sink = RecordingSink::default();
        let mut dispatcher = env.dispatcher(sink.clone());
        let event = env.write_save("480", "{\"A\": {\"earned\": tr");

        assert_eq!(dispatcher.handle(&event), DispatchOutcome::Unreadable);
        assert_eq!(dispatcher.progress().get("480").map(|g| g.last_notified_earned_time), Some(100));

        fs::remove_file(&event.path).expect("remove");
        assert_eq!(dispatcher.handle(&event), DispatchOutcome::Unreadable);
        assert!(sink.titles().is_empty());
    }

    #[test]
    fn unmatched_record_is_skipped_and_never_retried() {
        let env = Env::new();
        env.add_game("480", DEFINITIONS);
        env.write_save("480", &save(&[]));

        let sink = RecordingSink::default();
        let mut dispatcher = env.dispatcher(sink.clone());
        let event = env.write_save("480", &save(&[("A", true, 100), ("GHOST", true, 150)]));

        assert_eq!(
            dispatcher.handle(&event),
            DispatchOutcome::Notified { notified: 1, skipped: 1, watermark: 150 }
        );
        assert_eq!(dispatcher.handle(&event), DispatchOutcome::NothingNew);
        assert_eq!(sink.titles(), ["Alpha"]);
    }

    #[test]
    fn sink_failure_does_not_block_the_batch() {
        let env = Env::new();
        env.add_game("480", DEFINITIONS);
        env.write_save("480", &save(&[]));

        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let mut dispatcher = env.dispatcher(sink.clone());
        let event = env.write_save("480", &save(&[("A", true, 100), ("B", true, 200)]));

        assert_eq!(
            dispatcher.handle(&event),
            DispatchOutcome::Notified { notified: 2, skipped: 0, watermark: 200 }
        );
        assert_eq!(sink.titles().len(), 2);
        assert_eq!(env.errors(), ["notification_failed", "notification_failed"]);
        assert_eq!(dispatcher.handle(&event), DispatchOutcome::NothingNew);
    }

    #[test]
    fn language_falls_back_to_english_then_placeholder() {
        let env = Env::new();
        env.add_game("480", DEFINITIONS);
        env.write_save("480", &save(&[]));

        let sink = RecordingSink::default();
        let progress =
            ProgressStore::initialize(&env.local_root, &env.index(), &env.log).expect("init");
        let mut dispatcher =
            NotificationDispatcher::new(env.index(), progress, "german", sink.clone(), env.log.clone());

        let event = env.write_save("480", &save(&[("A", true, 1), ("B", true, 2), ("C", true, 3)]));
        dispatcher.handle(&event);

        let shown = sink.shown.lock().clone();
        assert_eq!(shown[0].title, "Alfa");
        assert_eq!(shown[0].body, "First one");
        assert_eq!(shown[1].title, "Beta");
        assert_eq!(shown[2].title, "Gamma");
        assert_eq!(shown[2].body, crate::models::achievements::BODY_PLACEHOLDER);
    }

    #[test]
    fn rapid_events_notify_each_achievement_once() {
        let env = Env::new();
        env.add_game("480", DEFINITIONS);
        env.write_save("480", &save(&[]));

        let sink = RecordingSink::default();
        let mut dispatcher = env.dispatcher(sink.clone());

        let snapshots: [&[(&str, bool, u64)]; 4] = [
            &[("A", true, 100)],
            &[("A", true, 100), ("B", true, 200)],
            &[("A", true, 100), ("B", true, 200), ("C", true, 300)],
            &[("A", true, 100), ("B", true, 200), ("C", true, 300)],
        ];
        for i in 0..10 {
            let body = save(snapshots[(i / 3).min(3)]);
            let event = env.write_save("480", &body);
            dispatcher.handle(&event);
            dispatcher.handle(&event);
        }

        assert_eq!(sink.titles(), ["Alpha", "Beta", TITLE_PLACEHOLDER]);
        assert_eq!(dispatcher.progress().get("480").map(|g| g.last_notified_earned_time), Some(300));
    }

    #[test]
    fn non_record_events_are_ignored() {
        let env = Env::new();
        let sink = RecordingSink::default();
        let mut dispatcher = env.dispatcher(sink);

        let other = ChangeEvent {
            path: env.local_root.join("480").join("stats.json"),
            is_dir: false,
        };
        assert_eq!(dispatcher.handle(&other), DispatchOutcome::Ignored);

        let dir = ChangeEvent {
            path: env.local_root.join("480").join(ACHIEVEMENTS_FILE_NAME),
            is_dir: true,
        };
        assert_eq!(dispatcher.handle(&dir), DispatchOutcome::Ignored);
        assert!(env.log.read(10, None).expect("read").is_empty());
    }
}
