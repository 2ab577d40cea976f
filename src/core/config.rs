use crate::models::achievements::DEFAULT_LANGUAGE;
use crate::models::Settings;
use std::path::PathBuf;

/// Raw values as they arrive from flags, the environment or `.env`.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    pub local_root: Option<String>,
    pub games_path: Option<String>,
    pub language: Option<String>,
    pub log_dir: Option<String>,
    pub app_name: Option<String>,
    pub sound: Option<String>,
}

/// Loads `.env` from the working directory into the process environment.
/// Variables already set win. Returns a warning when a `.env` exists but
/// could not be loaded; a missing file is not worth one.
pub fn load_dotenv() -> Option<String> {
    dotenv_warning(dotenvy::dotenv().map(|_| ()))
}

fn dotenv_warning(result: Result<(), dotenvy::Error>) -> Option<String> {
    match result {
        Ok(()) => None,
        Err(e) if e.not_found() => None,
        Err(e) => Some(format!("Failed to load .env: {}", e)),
    }
}

const SOUND_OFF: &str = "none";

/// Replaces `%VAR%`, `$VAR` and `${VAR}` with values from `lookup`.
/// Unknown variables are left as written.
pub fn expand_vars_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(['%', '$']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let (name, consumed) = if let Some(after) = tail.strip_prefix('%') {
            match after.find('%') {
                Some(end) if end > 0 => (Some(&after[..end]), end + 2),
                _ => (None, 1),
            }
        } else if let Some(after) = tail.strip_prefix("${") {
            match after.find('}') {
                Some(end) if end > 0 => (Some(&after[..end]), end + 3),
                _ => (None, 1),
            }
        } else {
            let after = &tail[1..];
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if end > 0 {
                (Some(&after[..end]), end + 1)
            } else {
                (None, 1)
            }
        };

        match name.and_then(|n| lookup(n).or_else(|| lookup(&n.to_uppercase()))) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&tail[..consumed]),
        }
        rest = &tail[consumed..];
    }

    out.push_str(rest);
    out
}

pub fn expand_vars(input: &str) -> String {
    expand_vars_with(input, |name| std::env::var(name).ok())
}

/// Splits a `;`-separated list of roots, dropping blanks.
pub fn split_roots(value: &str) -> Vec<PathBuf> {
    value
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| PathBuf::from(expand_vars(s)))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Settings {
    pub fn from_raw(raw: RawSettings) -> Self {
        let mut settings = Settings::default();

        if let Some(root) = non_empty(raw.local_root) {
            settings.local_root = PathBuf::from(expand_vars(&root));
        }
        if let Some(games) = non_empty(raw.games_path) {
            let roots = split_roots(&games);
            if !roots.is_empty() {
                settings.library_roots = roots;
            }
        }
        settings.language = non_empty(raw.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        if let Some(dir) = non_empty(raw.log_dir) {
            settings.log_dir = PathBuf::from(expand_vars(&dir));
        }
        if let Some(name) = non_empty(raw.app_name) {
            settings.app_name = name;
        }
        if let Some(sound) = non_empty(raw.sound) {
            settings.sound = (!sound.eq_ignore_ascii_case(SOUND_OFF)).then_some(sound);
        }
        settings
    }
}
