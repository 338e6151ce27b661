//! Error types.
//!
//! Only [`ControlError`] ever reaches the user: it is what the interactive
//! controls return when a setting could not be applied.  [`FetchError`] stays
//! inside the poller, which logs it and waits for the next tick.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A single poll failed.  Every variant is treated the same by the scheduler;
/// the detail is only there for the log.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed feed document: {0}")]
    Parse(#[from] rss::Error),
}

/// Invalid user input.  Nothing is changed when this is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("refresh interval must be between 1 and 1440 minutes, got {0}")]
    IntervalOutOfRange(i64),

    #[error("'{0}' is not a whole number of minutes")]
    NotANumber(String),
}

/// Writing the settings file failed.  The in-memory settings keep the new
/// value regardless.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to write settings to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialise settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Startup registration could not be changed.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("load on startup is not supported on {0}")]
    PlatformUnsupported(&'static str),

    #[error("could not determine the user configuration directory")]
    NoConfigDir,

    #[error("could not locate the running executable: {0}")]
    NoExecutable(#[source] io::Error),

    #[error("failed to update startup entry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything a mutating control can report back to the caller.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Startup(#[from] StartupError),
}

/// Why the settings file could not be read.  The caller falls back to
/// defaults for every variant.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("settings file {0} does not exist")]
    Missing(PathBuf),

    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed settings in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
