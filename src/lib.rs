mod commands;
pub mod core;
pub mod models;

use crate::core::app_log::AppLog;
use crate::core::config::{self, RawSettings};
use crate::models::Settings;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Desktop notifications for newly earned achievements")]
struct Cli {
    /// Folder holding one save folder per game.
    #[arg(long, env = "LOCAL_ACHIEVEMENTS_PATH", global = true)]
    local_root: Option<String>,

    /// Game library roots, separated by `;`.
    #[arg(long, env = "GAMES_PATH", global = true)]
    games_path: Option<String>,

    #[arg(long, env = "ACHIEVEMENT_LANGUAGE", global = true)]
    language: Option<String>,

    #[arg(long, env = "ACHIEVEMENT_LOG_DIR", global = true)]
    log_dir: Option<String>,

    #[arg(long, env = "ACHIEVEMENT_APP_NAME", global = true)]
    app_name: Option<String>,

    /// Notification sound name, or `none` for silent notifications.
    #[arg(long, env = "ACHIEVEMENT_SOUND", global = true)]
    sound: Option<String>,

    #[command(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch save folders and notify about new achievements (default).
    Watch,
    /// Show one game's achievements and completion.
    View {
        #[arg(long)]
        game: Option<String>,
        /// Show descriptions of hidden achievements.
        #[arg(long, alias = "nohide")]
        show_hidden: bool,
    },
    /// Print the most recent log records.
    Logs {
        #[arg(long, default_value_t = 200)]
        limit: u32,
        #[arg(long)]
        query: Option<String>,
    },
}

pub fn run() -> anyhow::Result<()> {
    let dotenv_warning = config::load_dotenv();
    if let Some(warning) = dotenv_warning.as_deref() {
        eprintln!("{}", warning);
    }
    let cli = Cli::parse();

    let settings = Settings::from_raw(RawSettings {
        local_root: cli.local_root,
        games_path: cli.games_path,
        language: cli.language,
        log_dir: cli.log_dir,
        app_name: cli.app_name,
        sound: cli.sound,
    });

    let log = AppLog::open(&settings.log_dir).map_err(anyhow::Error::msg)?;
    log.install_panic_hook();
    if let Some(warning) = dotenv_warning {
        log.warn("config", "dotenv_failed", Some(serde_json::json!({ "error": warning })));
    }

    match cli.cmd.unwrap_or(Commands::Watch) {
        Commands::Watch => commands::watch::run(&settings, &log),
        Commands::View { game, show_hidden } => commands::view::run(&settings, game, show_hidden),
        Commands::Logs { limit, query } => commands::logs::run(&log, limit, query),
    }
}
