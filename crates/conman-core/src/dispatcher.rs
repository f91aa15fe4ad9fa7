//! The poll/select dispatcher boundary.
//!
//! This crate decides *what* happens when an object's descriptor becomes
//! readable or writable ([`crate::io::read_from`], [`crate::io::write_to`])
//! and *how* the object graph changes ([`crate::link`]). It deliberately
//! does not decide *when* to call them: that is a daemon-level concern
//! (an event loop polling every open descriptor, accepting new socket
//! connections, reacting to `SIGHUP`/`SIGTERM`) that belongs to the
//! binary crate, not to the object-graph engine.
//!
//! [`Dispatcher`] names that seam as a trait so a binary crate's event
//! loop can be tested against a fake implementation without pulling in a
//! real `poll`/`epoll` backend.

use crate::ObjectId;
use crate::error::CoreError;

/// What an implementor's event loop does once per readiness notification.
///
/// A typical implementation wraps a single-threaded `poll` loop (matching
/// the original daemon's model) or a small fixed pool of worker threads
/// each draining a shard of the descriptor set; either way, the trait
/// itself takes no position on threading, since that decision lives with
/// the binary crate's main loop.
pub trait Dispatcher {
    /// Registers interest in `id`'s descriptor for read and/or write
    /// readiness, depending on whether it currently has unread input or
    /// buffered output.
    fn watch(&mut self, id: ObjectId) -> Result<(), CoreError>;

    /// Deregisters interest in `id`, called once its descriptor is closed.
    fn unwatch(&mut self, id: ObjectId);

    /// Blocks until at least one watched descriptor is ready, then invokes
    /// [`crate::io::read_from`]/[`crate::io::write_to`] for each and
    /// returns. Implementations decide their own timeout and signal
    /// handling.
    fn run_once(&mut self) -> Result<(), CoreError>;
}
