use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_LANGUAGE: &str = "english";
pub const TITLE_PLACEHOLDER: &str = "Unknown achievement";
pub const BODY_PLACEHOLDER: &str = "No description";

/// Platform-assigned numeric application id, also the name of a save subfolder.
pub type GameIdentifier = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMetadataEntry {
    pub identifier: GameIdentifier,
    pub achievements_file: PathBuf,
    pub marker_file: PathBuf,
}

/// Display text that is either a single string or keyed by language code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LocalizedText {
    Single(String),
    ByLanguage(BTreeMap<String, String>),
}

impl Default for LocalizedText {
    fn default() -> Self {
        LocalizedText::ByLanguage(BTreeMap::new())
    }
}

impl LocalizedText {
    pub fn get(&self, language: &str) -> Option<&str> {
        match self {
            LocalizedText::Single(s) => Some(s.as_str()),
            LocalizedText::ByLanguage(map) => map.get(language).map(String::as_str),
        }
    }

    /// Preferred language, then [`DEFAULT_LANGUAGE`], then `placeholder`.
    pub fn resolve<'a>(&'a self, language: &str, placeholder: &'a str) -> &'a str {
        self.get(language)
            .or_else(|| self.get(DEFAULT_LANGUAGE))
            .unwrap_or(placeholder)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AchievementDefinition {
    pub name: String,
    #[serde(default, rename = "displayName")]
    pub display_name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default, deserialize_with = "flag_from_any")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl AchievementDefinition {
    pub fn title(&self, language: &str) -> &str {
        self.display_name.resolve(language, TITLE_PLACEHOLDER)
    }

    pub fn body(&self, language: &str) -> &str {
        self.description.resolve(language, BODY_PLACEHOLDER)
    }
}

/// The save system writes `hidden` as 0/1, but generators also emit bools and strings.
fn flag_from_any<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        Some(Flag::Text(s)) => matches!(s.trim(), "1" | "true"),
        None => false,
    })
}

/// Per-achievement state as persisted by the save system, keyed by name in the file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LocalAchievementRecord {
    #[serde(skip)]
    pub name: String,
    pub earned: bool,
    #[serde(rename = "earned_time")]
    pub earned_time_unix: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_progress: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameProgressWatermark {
    pub identifier: GameIdentifier,
    pub achievements_file: PathBuf,
    pub last_notified_earned_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub icon: Option<PathBuf>,
}
