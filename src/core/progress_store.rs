use crate::core::app_log::AppLog;
use crate::core::error::{Result, WatchdogError};
use crate::core::metadata_index::GameMetadataIndex;
use crate::core::save_files::{load_local_records, max_earned_time, ACHIEVEMENTS_FILE_NAME};
use crate::models::{GameIdentifier, GameProgressWatermark};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

const SCOPE: &str = "progress";

/// Per-game watermark of the newest earn time that has already been notified.
#[derive(Debug, Default)]
pub struct ProgressStore {
    games: HashMap<GameIdentifier, GameProgressWatermark>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cold-start reconciliation over `local_root`.
    ///
    /// Only folders with a readable record file and a resolvable marker are
    /// tracked; each starts at its newest earned time so nothing already on
    /// disk is announced again.
    pub fn initialize(local_root: &Path, index: &GameMetadataIndex, log: &AppLog) -> Result<Self> {
        let mut candidates: HashMap<GameIdentifier, PathBuf> = HashMap::new();
        for entry in fs::read_dir(local_root).map_err(|e| WatchdogError::io(local_root, e))? {
            let Ok(entry) = entry else {
                continue;
            };
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let record_file = path.join(ACHIEVEMENTS_FILE_NAME);
            if !record_file.is_file() {
                continue;
            }
            let identifier = entry.file_name().to_string_lossy().into_owned();
            candidates.insert(identifier, record_file);
        }

        let identifiers: BTreeSet<GameIdentifier> = candidates.keys().cloned().collect();
        let resolved = index.resolve_all(&identifiers);

        let mut store = Self::new();
        for (identifier, record_file) in candidates {
            let Some(meta) = resolved.get(&identifier) else {
                log.info(
                    SCOPE,
                    "init_unresolved",
                    Some(json!({ "folder": identifier })),
                );
                continue;
            };

            let records = match load_local_records(&record_file) {
                Ok(records) => records,
                Err(e) => {
                    log.warn(
                        SCOPE,
                        "init_unreadable",
                        Some(json!({ "folder": identifier, "error": e.to_string() })),
                    );
                    continue;
                }
            };

            let watermark = max_earned_time(&records);
            log.info(
                SCOPE,
                "init_tracked",
                Some(json!({
                    "folder": identifier,
                    "achievements_file": meta.achievements_file,
                    "watermark": watermark,
                })),
            );
            store.games.insert(
                identifier.clone(),
                GameProgressWatermark {
                    identifier,
                    achievements_file: meta.achievements_file.clone(),
                    last_notified_earned_time: watermark,
                },
            );
        }

        Ok(store)
    }

    pub fn get(&self, identifier: &str) -> Option<&GameProgressWatermark> {
        self.games.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Starts tracking a folder discovered after startup, at watermark 0.
    /// An already tracked folder keeps its current watermark.
    pub fn track(&mut self, identifier: &str, achievements_file: PathBuf) -> &GameProgressWatermark {
        self.games
            .entry(identifier.to_string())
            .or_insert_with(|| GameProgressWatermark {
                identifier: identifier.to_string(),
                achievements_file,
                last_notified_earned_time: 0,
            })
    }

    /// Advances the watermark; it never moves backwards.
    pub fn record_notified(&mut self, identifier: &str, earned_time: u64) -> Option<u64> {
        let game = self.games.get_mut(identifier)?;
        game.last_notified_earned_time = game.last_notified_earned_time.max(earned_time);
        Some(game.last_notified_earned_time)
    }
}
