use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("no marker file matches save folder {0}")]
    UnresolvedMetadata(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("earned achievement {0} has no definition")]
    UnmatchedAchievement(String),

    #[error("failed to show notification: {0}")]
    Sink(String),

    #[error("failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

impl WatchdogError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        WatchdogError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        WatchdogError::Json {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchdogError>;
