#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Maps conman's single `-v`/`SERVER VERBOSE=` flag to a `tracing`
//! subscriber, the same role the teacher's `logging` crate fills for
//! rsync's richer `-v`/`--info`/`--debug` flag system — scaled down since
//! `examples/original_source/server-conf.c` only ever tracks one
//! `enableVerbose` boolean.
//!
//! # Design
//!
//! [`Verbosity::Normal`] installs a subscriber filtering below `info`;
//! [`Verbosity::Verbose`] drops the floor to `debug`. `RUST_LOG`, if set,
//! always wins over both, so operators can get finer-grained output than
//! `-v` offers without a code change.

use tracing_subscriber::EnvFilter;

/// The two verbosity levels conman's command line and configuration file
/// support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Default: warnings and above, plus a handful of lifecycle `info`
    /// events (startup, shutdown, console steals).
    Normal,
    /// `-v` / `SERVER VERBOSE=ON`: adds `debug`-level I/O tracing.
    Verbose,
}

impl Verbosity {
    fn default_filter(self) -> &'static str {
        match self {
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Installs a global `tracing` subscriber at the given verbosity.
///
/// Callers should invoke this once, at the top of `main`. A subscriber
/// already being installed (a second call in the same process, or a test
/// harness running several entry points in one binary) is not an error:
/// the existing subscriber is left in place.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.default_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_verbosity_filters_at_info() {
        assert_eq!(Verbosity::Normal.default_filter(), "info");
    }

    #[test]
    fn verbose_flag_lowers_floor_to_debug() {
        assert_eq!(Verbosity::Verbose.default_filter(), "debug");
    }
}
