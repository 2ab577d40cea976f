use crate::core::error::{Result, WatchdogError};
use crate::models::{AchievementDefinition, LocalAchievementRecord};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Name shared by the local record file and the achievement-definition file.
pub const ACHIEVEMENTS_FILE_NAME: &str = "achievements.json";
pub const MARKER_FILE_NAME: &str = "steam_appid.txt";

pub fn is_local_record_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name == ACHIEVEMENTS_FILE_NAME)
        .unwrap_or(false)
}

/// Records sorted by achievement name.
pub fn load_local_records(path: &Path) -> Result<Vec<LocalAchievementRecord>> {
    let bytes = fs::read(path).map_err(|e| WatchdogError::io(path, e))?;
    let by_name: BTreeMap<String, LocalAchievementRecord> =
        serde_json::from_slice(&bytes).map_err(|e| WatchdogError::json(path, e))?;

    Ok(by_name
        .into_iter()
        .map(|(name, mut record)| {
            record.name = name;
            record
        })
        .collect())
}

pub fn load_definitions(path: &Path) -> Result<Vec<AchievementDefinition>> {
    let bytes = fs::read(path).map_err(|e| WatchdogError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| WatchdogError::json(path, e))
}

pub fn read_marker(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path).map_err(|e| WatchdogError::io(path, e))?;
    Ok(text.trim().to_string())
}

/// Latest earn time among earned records, 0 when nothing is earned.
pub fn max_earned_time(records: &[LocalAchievementRecord]) -> u64 {
    records
        .iter()
        .filter(|r| r.earned)
        .map(|r| r.earned_time_unix)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_records_with_names_and_max_time() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(ACHIEVEMENTS_FILE_NAME);
        fs::write(
            &path,
            r#"{
                "ACH_B": {"earned": true, "earned_time": 200},
                "ACH_A": {"earned": true, "earned_time": 100},
                "ACH_C": {"earned": false, "earned_time": 900}
            }"#,
        )
        .expect("write");

        let records = load_local_records(&path).expect("load");
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["ACH_A", "ACH_B", "ACH_C"]);
        assert_eq!(max_earned_time(&records), 200);
        assert_eq!(max_earned_time(&[]), 0);
    }

    #[test]
    fn corrupt_and_missing_files_are_distinct_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(ACHIEVEMENTS_FILE_NAME);

        assert!(matches!(
            load_local_records(&path),
            Err(WatchdogError::Io { .. })
        ));

        fs::write(&path, "{ not json").expect("write");
        assert!(matches!(
            load_local_records(&path),
            Err(WatchdogError::Json { .. })
        ));
    }

    #[test]
    fn record_file_name_filter() {
        assert!(is_local_record_file(Path::new("/saves/480/achievements.json")));
        assert!(!is_local_record_file(Path::new("/saves/480/stats.json")));
        assert!(!is_local_record_file(Path::new("/")));
    }
}
