pub mod app_log;
pub mod change_watcher;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metadata_index;
pub mod notifier;
pub mod progress_store;
pub mod save_files;

pub use dispatcher::{DispatchOutcome, NotificationDispatcher};
pub use error::WatchdogError;
