//! Command-line parsing for `conmand`.
//!
//! Grounded on `examples/original_source/server-conf.c`'s
//! `process_server_cmd_line` (`getopt(argc, argv, "c:hkp:vVz")`) and
//! `crates/cli/src/lib.rs`'s use of the `clap` builder API rather than
//! `#[derive(Parser)]`.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};
use conman_core::DEFAULT_CONMAN_PORT;

/// Parsed command-line options.
#[derive(Debug, Clone)]
pub struct Args {
    /// `-c FILE`: alternate configuration file.
    pub config_path: Option<PathBuf>,
    /// `-k`: terminate the daemon instance already using this configuration.
    pub kill: bool,
    /// `-p PORT`: alternate listening port, overriding the configuration
    /// file and compiled-in default.
    pub port: Option<u16>,
    /// `-v`: verbose output.
    pub verbose: bool,
    /// `-V`: print version information and exit.
    pub version: bool,
    /// `-z`: zero (truncate) every console's log file at startup.
    pub zero_logs: bool,
}

fn command(program: &str) -> Command {
    Command::new(program.to_string())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("config")
                .short('c')
                .value_name("FILE")
                .help(format!(
                    "Specify alternate configuration (default: {})",
                    conman_core::server_config::DEFAULT_SERVER_CONF
                ))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("help")
                .short('h')
                .help("Display this help")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("kill")
                .short('k')
                .help("Kill daemon running with specified configuration")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .value_name("PORT")
                .help(format!("Specify alternate port number (default: {DEFAULT_CONMAN_PORT})"))
                .value_parser(clap::value_parser!(u16))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .help("Be verbose")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .short('V')
                .help("Display version information")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("zero-logs")
                .short('z')
                .help("Zero console log files")
                .action(ArgAction::SetTrue),
        )
}

/// What the caller should do after [`parse`] returns: run the daemon, or
/// print something and exit immediately without touching a configuration.
#[derive(Debug, Clone)]
pub enum Action {
    /// Print the usage text in `help_text` and exit successfully.
    PrintHelp(String),
    /// Print the version string and exit successfully.
    PrintVersion,
    /// Proceed to load the configuration and run the daemon.
    Run(Args),
}

/// Parses `argv`, resolving `-h`/`-V` into an immediate [`Action`] before
/// the configuration is ever touched, matching the original's `exit(0)`
/// inside `process_server_cmd_line` for those two flags.
///
/// # Errors
///
/// Returns a [`clap::Error`] for unrecognized options or malformed
/// argument values.
pub fn parse<I, S>(args: I) -> Result<Action, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let program = args
        .first()
        .map(|a| a.to_string_lossy().into_owned())
        .unwrap_or_else(|| "conmand".to_string());

    let cmd = command(&program);
    let matches = cmd.clone().try_get_matches_from(args)?;

    if matches.get_flag("help") {
        return Ok(Action::PrintHelp(cmd.render_long_help().to_string()));
    }
    if matches.get_flag("version") {
        return Ok(Action::PrintVersion);
    }

    Ok(Action::Run(Args {
        config_path: matches.get_one::<String>("config").map(PathBuf::from),
        kill: matches.get_flag("kill"),
        port: matches.get_one::<u16>("port").copied(),
        verbose: matches.get_flag("verbose"),
        version: false,
        zero_logs: matches.get_flag("zero-logs"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_flag_short_circuits_before_config_is_needed() {
        let action = parse(["conmand", "-h"]).unwrap();
        assert!(matches!(action, Action::PrintHelp(_)));
    }

    #[test]
    fn version_flag_short_circuits() {
        let action = parse(["conmand", "-V"]).unwrap();
        assert!(matches!(action, Action::PrintVersion));
    }

    #[test]
    fn parses_config_path_and_port() {
        let action = parse(["conmand", "-c", "/tmp/conman.conf", "-p", "7001"]).unwrap();
        let Action::Run(args) = action else {
            panic!("expected Action::Run");
        };
        assert_eq!(args.config_path, Some(PathBuf::from("/tmp/conman.conf")));
        assert_eq!(args.port, Some(7001));
    }

    #[test]
    fn parses_combination_of_boolean_flags() {
        let action = parse(["conmand", "-v", "-z", "-k"]).unwrap();
        let Action::Run(args) = action else {
            panic!("expected Action::Run");
        };
        assert!(args.verbose);
        assert!(args.zero_logs);
        assert!(args.kill);
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse(["conmand", "--bogus"]).is_err());
    }
}
