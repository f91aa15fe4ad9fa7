#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Loads a [`conman_core::ServerConfig`] from a `conman.conf`-style
//! directive file and holds the single-instance advisory lock that
//! prevents two daemon instances from sharing one configuration.
//!
//! # Design
//!
//! [`lexer`] tokenizes the file; [`directive`] walks the token stream and
//! populates the [`conman_core::ServerConfig`] passed in, collecting
//! [`error::ConfigWarning`]s for malformed directives instead of aborting.
//! [`lock`] wraps the `fs2`-based shared lock plus the `fcntl(F_GETLK)`
//! blocker-pid probe `-k` needs. [`load`] ties these together the way
//! `examples/original_source/server-conf.c`'s `process_server_conf_file`
//! does: open, lock, read, parse, then apply the port-precedence kludge.
//!
//! # Errors
//!
//! Fatal problems (the file cannot be opened, locked, or read) return
//! [`error::ConfigError`]; malformed individual directives are collected
//! as [`error::ConfigWarning`]s and returned alongside a parsed config.

/// Directive parsers for `CONSOLE` and `SERVER` lines.
pub mod directive;
/// Typed errors and non-fatal warnings.
pub mod error;
/// The configuration-file tokenizer.
pub mod lexer;
/// The single-instance advisory lock and `-k` blocker-pid probe.
pub mod lock;

use std::fs;
use std::path::Path;

use conman_core::ServerConfig;

pub use error::{ConfigError, ConfigWarning};

/// Outcome of [`load`]: the populated config plus any non-fatal warnings
/// encountered while parsing.
pub struct LoadOutcome {
    /// The populated configuration.
    pub config: ServerConfig,
    /// Warnings collected while parsing individual directives.
    pub warnings: Vec<ConfigWarning>,
}

/// Loads and locks the configuration file at `path`, returning a populated
/// [`ServerConfig`] and any directive warnings.
///
/// `cmdline_port` is the `-p` command-line override, if given; it takes
/// precedence over a `SERVER PORT=` directive in the file, which in turn
/// takes precedence over [`conman_core::DEFAULT_CONMAN_PORT`]. This mirrors
/// the "kludge" comment in `examples/original_source/server-conf.c`:
/// `conf->port` is saved before parsing and restored afterward if it was
/// set from the command line, since the parser itself cannot otherwise
/// tell a command-line value from an unset one.
///
/// `cmdline_zero_logs` is the `-z` command-line flag; it must be applied
/// before the file is parsed so [`directive::parse_console`] can truncate
/// each console's log file as it registers it.
///
/// # Errors
///
/// Returns [`ConfigError::Open`]/[`ConfigError::Lock`]/[`ConfigError::Read`]
/// for fatal I/O failures. A configuration already in use by another
/// instance is reported via [`ConfigError::AlreadyRunning`].
pub fn load(path: &Path, cmdline_port: Option<u16>, cmdline_zero_logs: bool) -> Result<LoadOutcome, ConfigError> {
    if let Some(pid) = lock::blocking_pid(path)? {
        return Err(ConfigError::AlreadyRunning {
            path: path.to_path_buf(),
            pid,
        });
    }

    let file = lock::acquire(path)?;
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config = ServerConfig::new();
    config.set_config_file(file);
    config.set_zero_logs(cmdline_zero_logs);

    let warnings = directive::parse_file(&text, &config);

    match cmdline_port {
        Some(port) => config.set_port(port),
        None if config.port() == 0 => config.set_port(conman_core::DEFAULT_CONMAN_PORT),
        None => {}
    }

    Ok(LoadOutcome { config, warnings })
}
