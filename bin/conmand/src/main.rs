#![deny(unsafe_code)]

//! Entry point for `conmand`, the conman console-concentrator daemon.
//!
//! Mirrors the teacher's `bin/oc-rsync`/`bin/oc-rsyncd` split: `main`
//! forwards the real argv/stdout/stderr into [`run_with`], which is
//! exercised directly by tests so the parsing and wiring logic never needs
//! an actual process to verify.

mod cli;

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use conman_logging::Verbosity;

fn main() -> ExitCode {
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr().lock();
    run_with(std::env::args_os(), &mut stdout, &mut stderr)
}

fn run_with<I, S, Out, Err>(args: I, stdout: &mut Out, stderr: &mut Err) -> ExitCode
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let action = match cli::parse(args) {
        Ok(action) => action,
        Err(e) => {
            let _ = write!(stderr, "{e}");
            return ExitCode::FAILURE;
        }
    };

    match action {
        cli::Action::PrintHelp(text) => {
            let _ = writeln!(stdout, "{text}");
            ExitCode::SUCCESS
        }
        cli::Action::PrintVersion => {
            let _ = writeln!(stdout, "conmand version {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        cli::Action::Run(args) => run_daemon(&args, stdout, stderr),
    }
}

fn config_path(args: &cli::Args) -> PathBuf {
    args.config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(conman_core::server_config::DEFAULT_SERVER_CONF))
}

fn run_daemon<Out, Err>(args: &cli::Args, stdout: &mut Out, stderr: &mut Err) -> ExitCode
where
    Out: Write,
    Err: Write,
{
    let path = config_path(args);

    if args.kill {
        return kill_daemon(&path, stdout, stderr);
    }

    let verbosity = if args.verbose { Verbosity::Verbose } else { Verbosity::Normal };
    conman_logging::init(verbosity);

    let outcome = match conman_config::load(&path, args.port, args.zero_logs) {
        Ok(outcome) => outcome,
        Err(e) => {
            let _ = writeln!(stderr, "conmand: {e}");
            return ExitCode::FAILURE;
        }
    };

    for warning in &outcome.warnings {
        let _ = writeln!(stderr, "{}", warning.render(&path));
    }

    tracing::info!(
        path = %path.display(),
        port = outcome.config.port(),
        consoles = outcome.config.object_ids().len(),
        "configuration loaded"
    );

    // The accept loop and poll/select dispatcher that would drive
    // `conman_core::io::read_from`/`write_to` off `outcome.config` live
    // outside this crate (see `conman_core::dispatcher::Dispatcher`); wiring
    // a concrete dispatcher implementation in is future work.

    ExitCode::SUCCESS
}

/// Implements `-k`: finds the pid holding the configuration's advisory
/// lock and sends it `SIGTERM`, matching `kill_daemon` in
/// `examples/original_source/server-conf.c`.
#[cfg(unix)]
fn kill_daemon<Out, Err>(path: &Path, stdout: &mut Out, stderr: &mut Err) -> ExitCode
where
    Out: Write,
    Err: Write,
{
    let pid = match conman_config::lock::blocking_pid(path) {
        Ok(Some(pid)) => pid,
        Ok(None) => {
            let _ = writeln!(stdout, "Configuration \"{}\" is not active.", path.display());
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = writeln!(stderr, "conmand: {e}");
            return ExitCode::FAILURE;
        }
    };

    // SAFETY: `pid` came from a successful `fcntl(F_GETLK)` probe against a
    // live lock holder; `libc::kill` is safe to call with any pid value.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc < 0 {
        let _ = writeln!(
            stderr,
            "conmand: unable to send SIGTERM to pid {pid}: {}",
            std::io::Error::last_os_error()
        );
        return ExitCode::FAILURE;
    }

    let _ = writeln!(stdout, "Configuration \"{}\" (pid {pid}) terminated.", path.display());
    ExitCode::SUCCESS
}

#[cfg(not(unix))]
fn kill_daemon<Out, Err>(path: &Path, stdout: &mut Out, _stderr: &mut Err) -> ExitCode
where
    Out: Write,
    Err: Write,
{
    let _ = writeln!(stdout, "Configuration \"{}\" is not active.", path.display());
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_flag_reports_success() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(["conmand", "-V"], &mut stdout, &mut stderr);
        assert_eq!(exit, ExitCode::SUCCESS);
        assert!(!stdout.is_empty());
        assert!(stderr.is_empty());
    }

    #[test]
    fn help_flag_reports_success_and_prints_usage() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(["conmand", "-h"], &mut stdout, &mut stderr);
        assert_eq!(exit, ExitCode::SUCCESS);
        let text = String::from_utf8(stdout).unwrap();
        assert!(text.contains("-c"));
        assert!(stderr.is_empty());
    }

    #[test]
    fn missing_configuration_file_is_a_failure() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(
            ["conmand", "-c", "/nonexistent/conman.conf"],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(exit, ExitCode::FAILURE);
        assert!(!stderr.is_empty());
    }

    #[test]
    fn kill_against_an_unlocked_configuration_reports_not_active() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(
            ["conmand", "-c", file.path().to_str().unwrap(), "-k"],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(exit, ExitCode::SUCCESS);
        let text = String::from_utf8(stdout).unwrap();
        assert!(text.contains("not active"));
    }

    #[test]
    fn loads_a_minimal_configuration_successfully() {
        use std::io::Write as _;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"CONSOLE NAME="node1" DEV="/dev/ttyS0""#).unwrap();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(
            ["conmand", "-c", file.path().to_str().unwrap()],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(exit, ExitCode::SUCCESS);
        assert!(stderr.is_empty());
    }
}
