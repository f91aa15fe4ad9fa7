//! The uniform byte endpoint shared by consoles, log files, and sockets.

use std::fmt;
use std::io::{Read, Write};
use std::sync::Mutex;
use std::time::Instant;

use crate::buffer::CircularBuffer;

/// A stable handle into a [`crate::ServerConfig`]'s object arena.
///
/// Using an index rather than a pointer or `Rc`/`Weak` pair keeps the
/// cyclic `writer`/`readers` cross-references plain `Copy` data; the arena
/// itself (a [`slab::Slab`]) is the sole owner, matching `spec.md` §9's
/// "arena-plus-stable-index" recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub(crate) usize);

/// Any type an object's descriptor can read from and write to.
///
/// Implemented for anything that is both [`Read`] and [`Write`] (e.g.
/// `std::fs::File`, `std::net::TcpStream`), so the I/O engine in
/// [`crate::io`] stays agnostic to which concrete descriptor kind backs a
/// given object.
pub trait Endpoint: Read + Write + Send {}
impl<T: Read + Write + Send> Endpoint for T {}

/// Which of the three object variants this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A serial/tty device, typically both read from and written to.
    Console,
    /// An append-only sink recording exactly one console's byte stream.
    LogFile,
    /// A client TCP connection, created already open.
    Socket,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::Console => "console",
            ObjectKind::LogFile => "logfile",
            ObjectKind::Socket => "socket",
        };
        f.write_str(s)
    }
}

/// Console-specific attributes.
#[derive(Debug, Clone, Default)]
pub struct Console {
    /// Device path, e.g. `/dev/ttyS0`.
    pub dev: String,
    /// Name of the `LogFile` object bound to this console, if any.
    pub log: Option<String>,
    /// Optional reset-command string (`RST=`). Invoking it is a
    /// serial-device concern out of this crate's scope; it is stored
    /// inertly, matching how `dev` itself is never opened here either.
    pub rst: Option<String>,
    /// Baud rate.
    pub bps: u32,
}

/// Log-file-specific attributes. Empty at rest — a logfile's only state is
/// its buffer and its single writer link.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFile;

/// Socket-specific attributes.
#[derive(Debug)]
pub struct Socket {
    /// Telnet in-band-signalling parser state.
    pub got_iac: bool,
    /// Monotonic time of the last successful read, consulted by an
    /// external keep-alive sweep.
    pub time_last_read: Instant,
}

/// Per-variant payload carried by an [`Object`].
#[derive(Debug)]
pub enum ObjectPayload {
    /// See [`Console`].
    Console(Console),
    /// See [`LogFile`].
    LogFile(LogFile),
    /// See [`Socket`].
    Socket(Socket),
}

impl ObjectPayload {
    /// The variant tag for this payload.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectPayload::Console(_) => ObjectKind::Console,
            ObjectPayload::LogFile(_) => ObjectKind::LogFile,
            ObjectPayload::Socket(_) => ObjectKind::Socket,
        }
    }

    /// Borrows the console payload, if this is a console.
    #[must_use]
    pub fn as_console(&self) -> Option<&Console> {
        match self {
            ObjectPayload::Console(c) => Some(c),
            _ => None,
        }
    }

    /// Borrows the socket payload, if this is a socket.
    #[must_use]
    pub fn as_socket(&self) -> Option<&Socket> {
        match self {
            ObjectPayload::Socket(s) => Some(s),
            _ => None,
        }
    }

    /// Mutably borrows the socket payload, if this is a socket.
    pub fn as_socket_mut(&mut self) -> Option<&mut Socket> {
        match self {
            ObjectPayload::Socket(s) => Some(s),
            _ => None,
        }
    }
}

/// The uniform byte endpoint: a console, log file, or socket.
///
/// Every mutable field is independently guarded by its own mutex rather
/// than by one global lock over the whole arena, so the I/O engine never
/// blocks graph operations on a different object (or vice versa) while a
/// read/write syscall is in flight. `spec.md` §5 calls the single
/// coarse-grained alternative a "future refinement"; per-object locks are
/// that refinement taken to the grain the teacher's own crates use for
/// per-connection state (compare `dashmap`'s per-shard locking, listed as
/// a workspace dependency for exactly this kind of shared session state).
///
/// `writer`/`readers` are non-owning cross-references into the same
/// [`crate::ServerConfig`] arena that owns `self`; by convention they are
/// mutated only by [`crate::link::link`] and [`crate::link::close`]
/// (`spec.md` §5), even though the type system does not forbid other
/// mutation.
pub struct Object {
    name: String,
    payload: Mutex<ObjectPayload>,
    fd: Mutex<Option<Box<dyn Endpoint>>>,
    /// Guards the circular buffer and its `gotEOF` flag (`bufLock`).
    pub(crate) buf: Mutex<CircularBuffer>,
    writer: Mutex<Option<ObjectId>>,
    readers: Mutex<Vec<ObjectId>>,
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Object {
    /// Builds a fully initialized object: an empty buffer, no writer, no
    /// readers, `gotEOF` cleared, and `fd` set to `descriptor` up front so
    /// a socket is "created already open" (never visible through the arena
    /// with a `None` descriptor) while a console or logfile, which opens
    /// later through [`crate::link::link`], starts with `None`.
    #[must_use]
    pub(crate) fn new(name: String, payload: ObjectPayload, descriptor: Option<Box<dyn Endpoint>>) -> Self {
        Self {
            name,
            payload: Mutex::new(payload),
            fd: Mutex::new(descriptor),
            buf: Mutex::new(CircularBuffer::new()),
            writer: Mutex::new(None),
            readers: Mutex::new(Vec::new()),
        }
    }

    /// Display identifier, unique per variant.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variant tag.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.payload.lock().expect("payload lock poisoned").kind()
    }

    /// Runs `f` with shared access to the per-variant payload.
    pub fn with_payload<R>(&self, f: impl FnOnce(&ObjectPayload) -> R) -> R {
        f(&self.payload.lock().expect("payload lock poisoned"))
    }

    /// Runs `f` with mutable access to the per-variant payload.
    pub fn with_payload_mut<R>(&self, f: impl FnOnce(&mut ObjectPayload) -> R) -> R {
        f(&mut self.payload.lock().expect("payload lock poisoned"))
    }

    /// `true` iff this object has an open descriptor.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.fd.lock().expect("fd lock poisoned").is_some()
    }

    /// Installs the descriptor for a freshly opened or accepted object.
    ///
    /// # Panics
    ///
    /// Panics if the object is already open; callers must check
    /// [`Self::is_open`] first (mirrors the `assert(obj->fd < 0)` in
    /// `examples/original_source/server-obj.c`'s `open_obj`).
    pub fn set_fd(&self, fd: Box<dyn Endpoint>) {
        let mut slot = self.fd.lock().expect("fd lock poisoned");
        assert!(slot.is_none(), "object '{}' is already open", self.name);
        *slot = Some(fd);
    }

    /// Takes the descriptor out, marking the object closed. Returns `None`
    /// if it was already closed.
    pub fn take_fd(&self) -> Option<Box<dyn Endpoint>> {
        self.fd.lock().expect("fd lock poisoned").take()
    }

    /// Runs `f` with mutable access to the open descriptor, if any.
    pub fn with_fd_mut<R>(&self, f: impl FnOnce(&mut dyn Endpoint) -> R) -> Option<R> {
        let mut slot = self.fd.lock().expect("fd lock poisoned");
        slot.as_deref_mut().map(f)
    }

    /// The object this one reads from, if linked.
    #[must_use]
    pub fn writer(&self) -> Option<ObjectId> {
        *self.writer.lock().expect("writer lock poisoned")
    }

    pub(crate) fn set_writer(&self, writer: Option<ObjectId>) {
        *self.writer.lock().expect("writer lock poisoned") = writer;
    }

    /// A snapshot of the objects that receive this object's bytes.
    #[must_use]
    pub fn readers(&self) -> Vec<ObjectId> {
        self.readers.lock().expect("readers lock poisoned").clone()
    }

    /// `true` iff this object currently has no readers.
    #[must_use]
    pub fn readers_is_empty(&self) -> bool {
        self.readers.lock().expect("readers lock poisoned").is_empty()
    }

    pub(crate) fn push_reader(&self, id: ObjectId) {
        self.readers.lock().expect("readers lock poisoned").push(id);
    }

    pub(crate) fn remove_reader(&self, id: ObjectId) {
        self.readers
            .lock()
            .expect("readers lock poisoned")
            .retain(|&r| r != id);
    }

    /// Pops one reader off the list, or `None` if it is empty. Used by
    /// [`crate::link::close`]'s drain loop, which must "pop each reader in
    /// turn until the list is empty" (`spec.md` §9(b)).
    pub(crate) fn pop_reader(&self) -> Option<ObjectId> {
        self.readers.lock().expect("readers lock poisoned").pop()
    }
}
