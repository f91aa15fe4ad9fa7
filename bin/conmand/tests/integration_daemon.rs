//! Multi-crate integration scenarios spanning `conman-config`'s directive
//! parser and `conman-core`'s object graph: a configuration file on disk
//! ends up as a console object, ready to be linked and drained, exactly the
//! way `bin/conmand`'s own startup sequence wires the two crates together.

use std::fs;
use std::io::Write;

use conman_core::{ObjectKind, link};

#[test]
fn loading_a_console_directive_produces_a_linkable_console_object() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"CONSOLE NAME="node1" DEV="/dev/ttyS0" BPS=9600"#).unwrap();

    let outcome = conman_config::load(file.path(), None, false).unwrap();

    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    let console_id = outcome
        .config
        .get_by_name(ObjectKind::Console, "node1")
        .expect("node1 console was registered");
    let console = outcome.config.get(console_id).unwrap();
    assert_eq!(console.kind(), ObjectKind::Console);
    assert!(!console.is_open(), "a console has no descriptor until linked");
}

#[test]
fn cmdline_port_overrides_a_configured_port_end_to_end() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "SERVER PORT=9999").unwrap();

    let outcome = conman_config::load(file.path(), Some(7000), false).unwrap();

    assert_eq!(outcome.config.port(), 7000);
}

#[test]
fn a_socket_linked_to_a_console_receives_the_steal_notice_on_its_own_buffer_when_stolen() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"CONSOLE NAME="node1" DEV="/dev/ttyS0""#).unwrap();
    let outcome = conman_config::load(file.path(), None, false).unwrap();
    let config = outcome.config;

    let console_id = config
        .get_by_name(ObjectKind::Console, "node1")
        .expect("node1 console was registered");

    let (first_pipe, _) = memory_pipe();
    let first = config.add_socket("alice", "host", Box::new(first_pipe)).unwrap();
    let (second_pipe, _) = memory_pipe();
    let second = config.add_socket("bob", "host", Box::new(second_pipe)).unwrap();

    link::link(&config, first, console_id).unwrap();
    link::link(&config, second, console_id).unwrap();

    let console = config.get(console_id).unwrap();
    assert_eq!(console.writer(), Some(second));
}

#[test]
fn zero_logs_truncates_an_existing_logfile_before_the_directive_parser_sees_it() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("node1.log");
    fs::write(&log_path, b"stale session output").unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"CONSOLE NAME="node1" DEV="/dev/ttyS0" LOG="{}""#,
        log_path.display()
    )
    .unwrap();

    let outcome = conman_config::load(file.path(), None, true).unwrap();

    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(fs::read(&log_path).unwrap(), b"");
}

/// A minimal in-memory `Read + Write` descriptor, just enough to stand in
/// for a client socket in an integration test that never opens a real one.
fn memory_pipe() -> (impl std::io::Read + std::io::Write + Send, ()) {
    struct Pipe;
    impl std::io::Read for Pipe {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Ok(0)
        }
    }
    impl std::io::Write for Pipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    (Pipe, ())
}
