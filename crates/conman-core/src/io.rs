//! Read/write entry points invoked by the dispatcher once `poll`/`select`
//! reports an object's descriptor as ready.
//!
//! Grounded on `examples/original_source/server-obj.c`'s `read_from_obj`
//! and `write_to_obj`. Both treat `io::ErrorKind` as the portable stand-in
//! for the original's `errno` branches: `Interrupted` retries, `WouldBlock`
//! is a silent no-op (the descriptor will be polled again later), and
//! anything else is a fatal [`CoreError::Io`] — except `write_to`'s
//! `BrokenPipe`, which flushes the buffer and sets `gotEOF` instead of
//! propagating.

use std::io::{ErrorKind, Read, Write};
use std::time::Instant;

use tracing::{trace, warn};

use crate::error::CoreError;
use crate::link;
use crate::object::Object;
use crate::server_config::ServerConfig;

/// In-band telnet control parser, consulted by [`read_from`] on every
/// socket read. Currently a no-op placeholder: `spec.md` §9 defers the
/// actual `IAC`-sequence state machine, so this only documents the seam
/// where it plugs in.
fn scan_for_iac(_data: &[u8], _got_iac: &mut bool) {}

/// Reads one chunk from `obj`'s descriptor and fans it out to every reader
/// whose buffer has not already seen `gotEOF`.
///
/// A zero-byte read (EOF on the underlying descriptor) closes the object.
/// Returns `Ok(false)` in that case so the dispatcher can drop its interest
/// in `obj`'s descriptor; `Ok(true)` means the object is still open.
///
/// # Errors
///
/// Returns [`CoreError::Io`] for any descriptor error other than
/// `Interrupted` (retried internally) or `WouldBlock` (treated as "nothing
/// to read yet").
pub fn read_from(
    config: &ServerConfig,
    obj_id: crate::ObjectId,
    obj: &Object,
) -> Result<bool, CoreError> {
    let mut chunk = [0u8; crate::buffer::MAX_BUF_SIZE - 1];

    let n = loop {
        let result = obj.with_fd_mut(|fd| fd.read(&mut chunk));
        let Some(result) = result else {
            return Ok(false);
        };
        match result {
            Ok(n) => break n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(true),
            Err(source) => {
                return Err(CoreError::Io {
                    object: obj.name().to_string(),
                    source,
                });
            }
        }
    };

    if n == 0 {
        link::close(config, obj_id);
        return Ok(false);
    }

    let data = &chunk[..n];

    obj.with_payload_mut(|payload| {
        if let Some(socket) = payload.as_socket_mut() {
            socket.time_last_read = Instant::now();
            scan_for_iac(data, &mut socket.got_iac);
        }
    });

    for reader_id in obj.readers() {
        let Some(reader) = config.get(reader_id) else {
            continue;
        };
        let already_eof = reader.buf.lock().expect("buf lock poisoned").got_eof();
        if !already_eof {
            write_obj_data(&reader, data);
        }
    }

    Ok(true)
}

/// Drains one contiguous run of `obj`'s circular buffer out to its
/// descriptor, wrapping around on the next call if the buffer had wrapped.
///
/// If the write hits `BrokenPipe`, the buffer is flushed and `gotEOF` is
/// set so the object closes on its next drain check rather than retrying a
/// dead descriptor forever. Once the buffer is empty and `gotEOF` is set,
/// the object is closed here.
///
/// # Errors
///
/// Returns [`CoreError::Io`] for any descriptor error other than
/// `Interrupted`, `WouldBlock`, or `BrokenPipe`.
pub fn write_to(
    config: &ServerConfig,
    obj_id: crate::ObjectId,
    obj: &Object,
) -> Result<(), CoreError> {
    // One lock guard spans the snapshot, the write, and `advance_out`: a
    // concurrent `write_obj_data` call that moved `out_idx` between an
    // unlock and a later re-lock would make the `n` this loop applies to
    // `advance_out` stale, corrupting the index `bufLock` exists to guard.
    let mut buf = obj.buf.lock().expect("buf lock poisoned");

    if !buf.is_empty() {
        loop {
            let run = buf.readable_slice();
            let result = obj.with_fd_mut(|fd| fd.write(run));
            let Some(result) = result else {
                break;
            };
            match result {
                Ok(n) if n > 0 => {
                    buf.advance_out(n);
                    break;
                }
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    buf.set_got_eof(true);
                    buf.flush();
                    break;
                }
                Err(source) => {
                    return Err(CoreError::Io {
                        object: obj.name().to_string(),
                        source,
                    });
                }
            }
        }
    }

    let drained_and_done = buf.got_eof() && buf.is_empty();
    drop(buf);
    if drained_and_done {
        trace!(object = obj.name(), "buffer drained after gotEOF, closing");
        link::close(config, obj_id);
    }

    Ok(())
}

/// Appends `src` to `obj`'s circular buffer, overwriting the oldest unread
/// bytes on overrun. A no-op if `obj` has already seen `gotEOF`.
///
/// Mirrors `write_obj_data` in
/// `examples/original_source/server-obj.c`, which silently drops data
/// written to an object that will never drain further.
pub fn write_obj_data(obj: &Object, src: &[u8]) {
    let mut buf = obj.buf.lock().expect("buf lock poisoned");
    if buf.got_eof() {
        return;
    }
    let outcome = buf.push_overwrite(src);
    if outcome.overwritten > 0 {
        warn!(
            object = obj.name(),
            overwritten = outcome.overwritten,
            "circular buffer overrun, oldest bytes discarded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Console;
    use crate::test_support::MemoryPipe;

    fn push_console(config: &ServerConfig, name: &str) -> crate::ObjectId {
        config
            .add_console(
                name,
                Console {
                    dev: format!("/dev/{name}"),
                    log: None,
                    rst: None,
                    bps: 9600,
                },
            )
            .unwrap()
    }

    #[test]
    fn read_from_closes_the_object_on_a_zero_byte_read() {
        let config = ServerConfig::new();
        let (pipe, _written) = MemoryPipe::new();
        let socket_id = config.add_socket("alice", "host", Box::new(pipe)).unwrap();
        let socket = config.get(socket_id).unwrap();

        let still_open = read_from(&config, socket_id, &socket).unwrap();

        assert!(!still_open);
        // A socket with no writer or readers and an empty buffer is
        // destroyed outright by `close`'s drain-before-destroy rule.
        assert!(config.get(socket_id).is_none());
    }

    #[test]
    fn read_from_reports_fatal_errors() {
        let config = ServerConfig::new();
        let (mut pipe, _written) = MemoryPipe::new();
        pipe.push_read_error(ErrorKind::PermissionDenied);
        let socket_id = config.add_socket("alice", "host", Box::new(pipe)).unwrap();
        let socket = config.get(socket_id).unwrap();

        let err = read_from(&config, socket_id, &socket).unwrap_err();

        assert!(matches!(err, CoreError::Io { .. }));
    }

    #[test]
    fn read_from_updates_time_last_read_and_fans_out_to_non_eof_readers() {
        let config = ServerConfig::new();

        let reader_a = push_console(&config, "reader-a");
        let reader_b = push_console(&config, "reader-b");
        let reader_a_obj = config.get(reader_a).unwrap();
        let reader_b_obj = config.get(reader_b).unwrap();
        reader_b_obj.buf.lock().unwrap().set_got_eof(true);

        let (mut pipe, _written) = MemoryPipe::new();
        pipe.push_read_data(b"hello".to_vec());
        let socket_id = config.add_socket("alice", "host", Box::new(pipe)).unwrap();
        let socket = config.get(socket_id).unwrap();

        let before = socket.with_payload(|p| p.as_socket().unwrap().time_last_read);
        socket.push_reader(reader_a);
        socket.push_reader(reader_b);

        let still_open = read_from(&config, socket_id, &socket).unwrap();

        assert!(still_open);
        assert_eq!(reader_a_obj.buf.lock().unwrap().readable_slice(), b"hello");
        assert!(reader_b_obj.buf.lock().unwrap().readable_slice().is_empty());
        let after = socket.with_payload(|p| p.as_socket().unwrap().time_last_read);
        assert!(after >= before);
    }

    #[test]
    fn write_obj_data_is_a_no_op_once_got_eof_is_set() {
        let config = ServerConfig::new();
        let id = push_console(&config, "node1");
        let obj = config.get(id).unwrap();
        obj.buf.lock().unwrap().set_got_eof(true);

        write_obj_data(&obj, b"ignored");

        assert!(obj.buf.lock().unwrap().is_empty());
    }

    #[test]
    fn write_to_drains_the_buffer_then_closes_once_got_eof_is_set() {
        let config = ServerConfig::new();
        let console_id = push_console(&config, "node1");
        let console = config.get(console_id).unwrap();
        let (pipe, written) = MemoryPipe::new();
        console.set_fd(Box::new(pipe));
        write_obj_data(&console, b"hello");
        console.buf.lock().unwrap().set_got_eof(true);

        write_to(&config, console_id, &console).unwrap();

        assert_eq!(&*written.lock().unwrap(), b"hello");
        assert!(console.buf.lock().unwrap().is_empty());
        assert!(!console.is_open());
    }

    #[test]
    fn write_to_flushes_and_closes_on_broken_pipe() {
        let config = ServerConfig::new();
        let console_id = push_console(&config, "node1");
        let console = config.get(console_id).unwrap();
        let (mut pipe, _written) = MemoryPipe::new();
        pipe.push_write_error(ErrorKind::BrokenPipe);
        console.set_fd(Box::new(pipe));
        write_obj_data(&console, b"hello");

        write_to(&config, console_id, &console).unwrap();

        assert!(console.buf.lock().unwrap().is_empty());
        assert!(!console.is_open());
    }
}
