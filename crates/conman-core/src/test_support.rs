//! In-memory descriptor stand-in shared by `io.rs`'s and `link.rs`'s unit
//! tests, so neither has to touch a real file or socket to exercise the
//! `Read`/`Write` branches of [`crate::io::read_from`]/[`crate::io::write_to`].

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

enum ReadStep {
    Data(Vec<u8>),
    Error(io::ErrorKind),
}

enum WriteStep {
    Error(io::ErrorKind),
}

/// A canned `Read + Write` descriptor. Reads are served from a queue of
/// scripted chunks/errors, defaulting to a zero-byte (EOF) read once the
/// queue is empty. Writes normally succeed in full, recording every byte
/// into the shared `written` handle returned by [`MemoryPipe::new`]; a
/// queued [`WriteStep::Error`] forces the next write to fail instead.
pub(crate) struct MemoryPipe {
    reads: VecDeque<ReadStep>,
    writes: VecDeque<WriteStep>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl MemoryPipe {
    /// Returns a fresh pipe plus a handle onto the bytes it will accept
    /// through [`Write::write`].
    pub(crate) fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                reads: VecDeque::new(),
                writes: VecDeque::new(),
                written: written.clone(),
            },
            written,
        )
    }

    pub(crate) fn push_read_data(&mut self, data: impl Into<Vec<u8>>) {
        self.reads.push_back(ReadStep::Data(data.into()));
    }

    pub(crate) fn push_read_error(&mut self, kind: io::ErrorKind) {
        self.reads.push_back(ReadStep::Error(kind));
    }

    pub(crate) fn push_write_error(&mut self, kind: io::ErrorKind) {
        self.writes.push_back(WriteStep::Error(kind));
    }
}

impl Read for MemoryPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reads.pop_front() {
            Some(ReadStep::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(ReadStep::Error(kind)) => Err(io::Error::from(kind)),
            None => Ok(0),
        }
    }
}

impl Write for MemoryPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writes.pop_front() {
            Some(WriteStep::Error(kind)) => Err(io::Error::from(kind)),
            None => {
                self.written.lock().expect("written lock poisoned").extend_from_slice(buf);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
