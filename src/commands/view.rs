use crate::core::metadata_index::GameMetadataIndex;
use crate::core::save_files::{load_definitions, load_local_records, ACHIEVEMENTS_FILE_NAME};
use crate::models::{AchievementDefinition, GameIdentifier, LocalAchievementRecord, Settings};
use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

const SEPARATOR: &str = "--------------------------------------";

#[derive(Debug, Clone, PartialEq)]
pub struct InstalledGame {
    pub identifier: GameIdentifier,
    pub folder_name: String,
    pub local_file: PathBuf,
    pub achievements_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub current: u64,
    pub max: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AchievementLine {
    pub display_name: String,
    /// `None` while the achievement is hidden.
    pub description: Option<String>,
    pub progress: Option<Progress>,
    pub earned: bool,
    pub earned_time_unix: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameReport {
    pub lines: Vec<AchievementLine>,
    pub earned: usize,
    pub total: usize,
}

impl GameReport {
    pub fn completion_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.earned as f64 / self.total as f64 * 100.0
    }
}

fn progress_of(record: &LocalAchievementRecord) -> Option<Progress> {
    let (current, max) = (record.progress?, record.max_progress?);
    if record.earned {
        return Some(Progress {
            current: max,
            max,
            percent: 100.0,
        });
    }
    let percent = if max == 0 {
        0.0
    } else {
        current as f64 / max as f64 * 100.0
    };
    Some(Progress {
        current,
        max,
        percent,
    })
}

/// One line per defined achievement that has a local record, in definition order.
pub fn build_report(
    definitions: &[AchievementDefinition],
    records: &[LocalAchievementRecord],
    language: &str,
    show_hidden: bool,
) -> GameReport {
    let by_name: HashMap<&str, &LocalAchievementRecord> =
        records.iter().map(|r| (r.name.as_str(), r)).collect();

    let mut report = GameReport {
        total: definitions.len(),
        ..GameReport::default()
    };
    for definition in definitions {
        let Some(record) = by_name.get(definition.name.as_str()) else {
            continue;
        };
        if record.earned {
            report.earned += 1;
        }
        let concealed = definition.hidden && !record.earned && !show_hidden;
        report.lines.push(AchievementLine {
            display_name: definition.title(language).to_string(),
            description: (!concealed).then(|| definition.body(language).to_string()),
            progress: progress_of(record),
            earned: record.earned,
            earned_time_unix: record.earned_time_unix,
        });
    }
    report
}

/// Save folders that resolve to a game in one of the libraries, sorted by identifier.
pub fn installed_games(settings: &Settings) -> anyhow::Result<Vec<InstalledGame>> {
    let index = GameMetadataIndex::new(settings.library_roots.clone());
    let identifiers: BTreeSet<GameIdentifier> = fs::read_dir(&settings.local_root)
        .with_context(|| format!("Failed to read {}", settings.local_root.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();

    let resolved = index.resolve_all(&identifiers);
    Ok(identifiers
        .into_iter()
        .filter_map(|identifier| {
            let entry = resolved.get(&identifier)?;
            Some(InstalledGame {
                folder_name: index
                    .game_folder_name(entry)
                    .unwrap_or_else(|| identifier.clone()),
                local_file: settings.local_root.join(&identifier).join(ACHIEVEMENTS_FILE_NAME),
                achievements_file: entry.achievements_file.clone(),
                identifier,
            })
        })
        .collect())
}

fn format_earned_time(unix: u64) -> String {
    if unix == 0 {
        return "Not Earned".to_string();
    }
    DateTime::from_timestamp(unix as i64, 0)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| unix.to_string())
}

fn print_report(report: &GameReport) {
    println!("\n{}\n", SEPARATOR);
    for line in &report.lines {
        println!("Achievement: {}", line.display_name);
        match &line.description {
            Some(description) => println!("Description: {}", description),
            None => println!("This achievement is hidden."),
        }
        if let Some(p) = &line.progress {
            println!("Progress: {:.1}% ({}/{})", p.percent, p.current, p.max);
        }
        println!(
            "Earned: {} | Earned Time: {}",
            if line.earned { "Yes" } else { "No" },
            format_earned_time(line.earned_time_unix)
        );
        println!("\n{}\n", SEPARATOR);
    }
    println!(
        "Earned: {:.1}% ({}/{})",
        report.completion_percent(),
        report.earned,
        report.total
    );
}

fn prompt_for_game(games: &[InstalledGame]) -> anyhow::Result<&InstalledGame> {
    print!("\nChoose game to view achievements for: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    input
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| games.get(i))
        .context("Invalid selection.")
}

pub fn run(settings: &Settings, game: Option<String>, show_hidden: bool) -> anyhow::Result<()> {
    let games = installed_games(settings)?;
    if games.is_empty() {
        bail!("No games found with matching steam_appid.txt files.");
    }

    let selected = match game {
        Some(id) => games
            .iter()
            .find(|g| g.identifier == id.trim())
            .with_context(|| format!("No installed game with id {}", id))?,
        None => {
            println!("Found achievements support for the following installed games:");
            for (i, g) in games.iter().enumerate() {
                println!("{}. {} ({})", i + 1, g.folder_name, g.identifier);
            }
            prompt_for_game(&games)?
        }
    };

    if !selected.local_file.is_file() || !selected.achievements_file.is_file() {
        bail!("Missing achievements.json in local or games folder.");
    }
    let records = load_local_records(&selected.local_file)?;
    let definitions = load_definitions(&selected.achievements_file)?;

    print_report(&build_report(
        &definitions,
        &records,
        &settings.language,
        show_hidden,
    ));
    Ok(())
}
