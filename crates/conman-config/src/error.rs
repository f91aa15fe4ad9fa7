//! Typed errors and non-fatal warnings for configuration loading.

use std::io;
use std::path::PathBuf;

/// Fatal failures that stop configuration loading entirely.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be opened.
    #[error("unable to open \"{path}\": {source}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configuration is already locked by a running daemon instance.
    #[error("configuration \"{path}\" in use by pid {pid}")]
    AlreadyRunning {
        /// Path to the configuration file.
        path: PathBuf,
        /// Pid of the daemon instance holding the lock.
        pid: i32,
    },

    /// The advisory lock could not be acquired for a reason other than
    /// contention (e.g. the filesystem does not support locking).
    #[error("unable to lock configuration \"{path}\": {source}")]
    Lock {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Reading the configuration file's contents failed.
    #[error("unable to read \"{path}\": {source}")]
    Read {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Registering an object with [`conman_core::ServerConfig`] failed.
    #[error(transparent)]
    Core(#[from] conman_core::CoreError),
}

/// A non-fatal problem encountered while parsing one directive. The parser
/// prints these and resynchronizes at the next end-of-line rather than
/// aborting, matching `examples/original_source/server-conf.c`'s
/// `fprintf(stderr, "ERROR: %s:%d: %s.\n", ...)` followed by a resync loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// 1-based line number the problem was found on.
    pub line: u32,
    /// Human-readable description, without trailing punctuation (the
    /// caller appends `.` when rendering, matching the original's format
    /// string).
    pub message: String,
}

impl ConfigWarning {
    pub(crate) fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    /// Renders this warning in the `ERROR: <file>:<line>: <message>.`
    /// format the original prints to stderr.
    #[must_use]
    pub fn render(&self, path: &std::path::Path) -> String {
        format!("ERROR: {}:{}: {}.", path.display(), self.line, self.message)
    }
}
