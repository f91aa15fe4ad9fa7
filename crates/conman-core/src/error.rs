//! Typed errors for object construction, linking, and I/O.

use std::io;

use crate::object::{ObjectId, ObjectKind};

/// Errors that can occur while constructing, linking, or draining objects.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A console, logfile, or socket with this name already exists for the
    /// same variant (`spec.md` §9(d): "pending check" made real).
    #[error("{kind} object named '{name}' already exists")]
    DuplicateName {
        /// The variant that already owns the name.
        kind: ObjectKind,
        /// The colliding name.
        name: String,
    },

    /// Fatal, non-retryable failure from a read/write syscall.
    #[error("I/O error on object '{object}': {source}")]
    Io {
        /// Name of the object whose descriptor failed.
        object: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Attempted to open an object whose descriptor is already active.
    #[error("object '{0}' is already open")]
    AlreadyOpen(String),

    /// A link or close operation referenced an id no longer present in the
    /// arena (the object was already removed, or the id came from a
    /// different `ServerConfig`).
    #[error("no object registered for {0:?}")]
    NotFound(ObjectId),
}
