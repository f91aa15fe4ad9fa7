#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `conman_core` is the object graph and I/O multiplexing engine at the
//! heart of the conman console-concentrator daemon. It models three kinds
//! of byte endpoint — serial consoles, append-only log files, and client
//! sockets — as a single [`Object`] type, links them into a directed
//! reader/writer graph, and buffers bytes between them in a fixed-size
//! circular queue that never blocks a producer.
//!
//! # Design
//!
//! [`ServerConfig`] owns every [`Object`] in a [`slab::Slab`], addressed by
//! the stable [`ObjectId`] newtype rather than by pointer, so the
//! `writer`/`readers` cross-references in [`object::Object`] can be plain
//! `Copy` handles instead of raw pointers or reference-counted cells. The
//! [`link`] module implements the edge-management rules (`link`, steal,
//! `close`, EOF-drain cascade); the [`io`] module implements the two
//! dispatcher-facing entry points, [`io::read_from`] and [`io::write_to`],
//! plus the circular-buffer producer [`io::write_obj_data`].
//!
//! The actual accept loop and poll/select dispatcher that decide *when* to
//! call `read_from`/`write_to` are deliberately outside this crate; the
//! [`dispatcher::Dispatcher`] trait documents that seam without
//! implementing it.
//!
//! # Invariants
//!
//! - Every mutation of an object's buffer indices or `gotEOF` flag happens
//!   under that object's `buf_lock`.
//! - The object graph (`writer`, `readers`, slab membership) is mutated
//!   only by [`link`] and [`close`](link::close); other call sites may read
//!   it but never add or remove edges directly.
//! - A [`ObjectKind::LogFile`] always has a [`ObjectKind::Console`] writer;
//!   a [`ObjectKind::Socket`] has at most one reader, itself a console; a
//!   console has at most one writer.
//!
//! # Errors
//!
//! Fallible operations return [`error::CoreError`]. Buffer-index and
//! variant-rule violations are `debug_assert!`s, matching the "programming
//! invariant violation" class in the design's error taxonomy: they abort in
//! debug and test builds rather than propagating as a typed error.

/// Fixed-size circular buffer shared by every object.
pub mod buffer;
/// The external poll/select dispatcher boundary (trait only, no impl).
pub mod dispatcher;
/// Typed error enum for the core crate.
pub mod error;
/// Read/write entry points invoked by the dispatcher.
pub mod io;
/// The link manager: `link`, steal, and `close`.
pub mod link;
/// The uniform `Object` type and its three variants.
pub mod object;
/// `ServerConfig`: the owning collection of objects plus daemon-wide flags.
pub mod server_config;
#[cfg(test)]
mod test_support;

pub use buffer::{CircularBuffer, MAX_BUF_SIZE};
pub use dispatcher::Dispatcher;
pub use error::CoreError;
pub use object::{Console, LogFile, Object, ObjectId, ObjectKind, Socket};
pub use server_config::ServerConfig;

/// Default console baud rate used when a `CONSOLE` directive omits `BPS=`.
pub const DEFAULT_CONSOLE_BAUD: u32 = 9600;

/// Default listening port used when neither `-p` nor `SERVER PORT=` is set.
pub const DEFAULT_CONMAN_PORT: u16 = 7890;
