use crate::core::error::{Result, WatchdogError};
use crate::core::save_files::{read_marker, ACHIEVEMENTS_FILE_NAME, MARKER_FILE_NAME};
use crate::models::{GameIdentifier, GameMetadataEntry};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Maps save-folder identifiers to achievement-definition files by scanning
/// library roots for marker files. Nothing is cached between calls.
///
/// When two markers carry the same identifier the first one in traversal
/// order wins. Traversal is sorted by file name, but which duplicate is
/// "right" is not something this index tries to decide.
#[derive(Debug, Clone)]
pub struct GameMetadataIndex {
    library_roots: Vec<PathBuf>,
}

fn is_marker_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name == MARKER_FILE_NAME)
        .unwrap_or(false)
}

fn entry_for(identifier: GameIdentifier, marker_file: PathBuf) -> GameMetadataEntry {
    let achievements_file = marker_file
        .parent()
        .map(|dir| dir.join(ACHIEVEMENTS_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(ACHIEVEMENTS_FILE_NAME));
    GameMetadataEntry {
        identifier,
        achievements_file,
        marker_file,
    }
}

impl GameMetadataIndex {
    pub fn new(library_roots: Vec<PathBuf>) -> Self {
        Self { library_roots }
    }

    pub fn library_roots(&self) -> &[PathBuf] {
        &self.library_roots
    }

    /// Every marker file under the library roots, paired with its trimmed content.
    /// Unreadable directories and markers are skipped.
    fn markers(&self) -> impl Iterator<Item = (String, PathBuf)> + '_ {
        self.library_roots.iter().flat_map(|root| {
            WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file() && is_marker_file(entry.path()))
                .filter_map(|entry| {
                    let path = entry.into_path();
                    read_marker(&path).ok().map(|id| (id, path))
                })
        })
    }

    pub fn resolve(&self, identifier: &str) -> Result<GameMetadataEntry> {
        let wanted = identifier.trim();
        self.markers()
            .find(|(id, _)| id == wanted)
            .map(|(id, marker)| entry_for(id, marker))
            .ok_or_else(|| WatchdogError::UnresolvedMetadata(wanted.to_string()))
    }

    /// Resolves a whole set of identifiers with a single scan per root.
    /// Identifiers without a marker are absent from the result.
    pub fn resolve_all(
        &self,
        identifiers: &BTreeSet<GameIdentifier>,
    ) -> HashMap<GameIdentifier, GameMetadataEntry> {
        let mut found: HashMap<GameIdentifier, GameMetadataEntry> = HashMap::new();
        if identifiers.is_empty() {
            return found;
        }

        for (id, marker) in self.markers() {
            if !identifiers.contains(&id) || found.contains_key(&id) {
                continue;
            }
            found.insert(id.clone(), entry_for(id, marker));
            if found.len() == identifiers.len() {
                break;
            }
        }
        found
    }

    /// Name of the top-level library folder that contains `entry`.
    pub fn game_folder_name(&self, entry: &GameMetadataEntry) -> Option<String> {
        self.library_roots.iter().find_map(|root| {
            entry
                .marker_file
                .strip_prefix(root)
                .ok()
                .and_then(|rel| rel.components().next())
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn add_game(root: &Path, rel: &str, marker: &str) -> PathBuf {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join(MARKER_FILE_NAME), marker).expect("write marker");
        dir
    }

    #[test]
    fn resolves_trimmed_exact_match() {
        let lib = tempfile::tempdir().expect("tempdir");
        let dir = add_game(lib.path(), "Spacewar/steam_settings", " 480\r\n");
        add_game(lib.path(), "Other/steam_settings", "4800");

        let index = GameMetadataIndex::new(vec![lib.path().to_path_buf()]);
        let entry = index.resolve("480").expect("resolve");
        assert_eq!(entry.identifier, "480");
        assert_eq!(entry.achievements_file, dir.join(ACHIEVEMENTS_FILE_NAME));

        assert!(matches!(
            index.resolve("48"),
            Err(WatchdogError::UnresolvedMetadata(id)) if id == "48"
        ));
    }

    #[test]
    fn rescans_on_every_resolve() {
        let lib = tempfile::tempdir().expect("tempdir");
        let index = GameMetadataIndex::new(vec![lib.path().to_path_buf()]);
        assert!(index.resolve("620").is_err());

        add_game(lib.path(), "Portal 2", "620");
        assert!(index.resolve("620").is_ok());
    }

    #[test]
    fn resolve_all_spans_roots_and_skips_unknown() {
        let lib_a = tempfile::tempdir().expect("tempdir");
        let lib_b = tempfile::tempdir().expect("tempdir");
        add_game(lib_a.path(), "A", "10");
        add_game(lib_b.path(), "B/deep/er", "20");
        add_game(lib_b.path(), "C", "30");

        let index = GameMetadataIndex::new(vec![
            lib_a.path().to_path_buf(),
            lib_b.path().join("missing"),
            lib_b.path().to_path_buf(),
        ]);
        let wanted: BTreeSet<String> = ["10", "20", "99"].iter().map(|s| s.to_string()).collect();
        let found = index.resolve_all(&wanted);

        assert_eq!(found.len(), 2);
        assert!(found.contains_key("10"));
        assert!(found["20"].achievements_file.starts_with(lib_b.path().join("B")));
        assert!(!found.contains_key("30"));
    }

    #[test]
    fn first_sorted_duplicate_names_the_game_folder() {
        let lib = tempfile::tempdir().expect("tempdir");
        add_game(lib.path(), "Half-Life/bin/steam_settings", "70");
        add_game(lib.path(), "Zzz duplicate", "70");

        let index = GameMetadataIndex::new(vec![lib.path().to_path_buf()]);
        let entry = index.resolve("70").expect("resolve");
        assert!(entry.marker_file.starts_with(lib.path().join("Half-Life")));
        assert_eq!(index.game_folder_name(&entry).as_deref(), Some("Half-Life"));
    }
}
