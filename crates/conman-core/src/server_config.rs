//! `ServerConfig`: the owning collection of objects plus daemon-wide flags.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use slab::Slab;

use crate::error::CoreError;
use crate::object::{Console, Endpoint, LogFile, Object, ObjectId, ObjectKind, ObjectPayload, Socket};

/// Default configuration file path, used when `-c` is not given.
pub const DEFAULT_SERVER_CONF: &str = "/etc/conman.conf";

struct ObjectArena {
    slab: Slab<Arc<Object>>,
    names: HashMap<(ObjectKind, String), ObjectId>,
}

impl ObjectArena {
    fn new() -> Self {
        Self {
            slab: Slab::new(),
            names: HashMap::new(),
        }
    }

    fn insert(
        &mut self,
        name: String,
        payload: ObjectPayload,
        descriptor: Option<Box<dyn Endpoint>>,
    ) -> Result<ObjectId, CoreError> {
        let kind = payload.kind();
        let key = (kind, name.clone());
        if self.names.contains_key(&key) {
            return Err(CoreError::DuplicateName { kind, name });
        }
        let object = Arc::new(Object::new(name, payload, descriptor));
        let slot = self.slab.insert(object);
        let id = ObjectId(slot);
        self.names.insert(key, id);
        Ok(id)
    }

    fn remove(&mut self, id: ObjectId) -> Option<Arc<Object>> {
        if !self.slab.contains(id.0) {
            return None;
        }
        let object = self.slab.remove(id.0);
        self.names.retain(|_, v| *v != id);
        Some(object)
    }
}

/// Mutable record holding the daemon's configuration and its object
/// collection (`spec.md` §3). Populated first from command-line overrides,
/// then from the configuration file by `conman-config`'s directive parser.
pub struct ServerConfig {
    config_path: PathBuf,
    /// Held open for the daemon's lifetime as the single-instance advisory
    /// lock handle; `conman-config::lock` acquires/probes locks on it.
    config_file: Mutex<Option<File>>,
    port: Mutex<u16>,
    log_filename: Mutex<Option<String>>,
    log_file: Mutex<Option<File>>,
    keep_alive: Mutex<bool>,
    zero_logs: Mutex<bool>,
    loop_back: Mutex<bool>,
    verbose: Mutex<bool>,
    arena: Mutex<ObjectArena>,
}

impl ServerConfig {
    /// Builds a config with compiled-in defaults: port `0` (resolved later,
    /// see `spec.md` §4.2's port-precedence rule), `keepAlive` on, the
    /// other flags off, no objects.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_SERVER_CONF),
            config_file: Mutex::new(None),
            port: Mutex::new(0),
            log_filename: Mutex::new(None),
            log_file: Mutex::new(None),
            keep_alive: Mutex::new(true),
            zero_logs: Mutex::new(false),
            loop_back: Mutex::new(false),
            verbose: Mutex::new(false),
            arena: Mutex::new(ObjectArena::new()),
        }
    }

    /// Path to the configuration file.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Overrides the configuration file path (`-c FILE`).
    pub fn set_config_path(&mut self, path: impl Into<PathBuf>) {
        self.config_path = path.into();
    }

    /// The file descriptor held open for the single-instance lock, if the
    /// configuration has been opened yet.
    pub fn config_file(&self) -> MutexGuard<'_, Option<File>> {
        self.config_file.lock().expect("config_file lock poisoned")
    }

    /// Installs the opened configuration file descriptor.
    pub fn set_config_file(&self, file: File) {
        *self.config_file.lock().expect("config_file lock poisoned") = Some(file);
    }

    /// Listening TCP port; `0` until resolved (`spec.md` §3).
    #[must_use]
    pub fn port(&self) -> u16 {
        *self.port.lock().expect("port lock poisoned")
    }

    /// Sets the listening port.
    pub fn set_port(&self, port: u16) {
        *self.port.lock().expect("port lock poisoned") = port;
    }

    /// Global log filename, if `SERVER LOGFILE=` is ever implemented.
    #[must_use]
    pub fn log_filename(&self) -> Option<String> {
        self.log_filename.lock().expect("log_filename lock poisoned").clone()
    }

    /// Sets the global log filename.
    pub fn set_log_filename(&self, name: Option<String>) {
        *self.log_filename.lock().expect("log_filename lock poisoned") = name;
    }

    /// Installs the global log file descriptor.
    pub fn set_log_file(&self, file: Option<File>) {
        *self.log_file.lock().expect("log_file lock poisoned") = file;
    }

    /// `KEEPALIVE` flag.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        *self.keep_alive.lock().expect("keep_alive lock poisoned")
    }

    /// Sets the `KEEPALIVE` flag.
    pub fn set_keep_alive(&self, value: bool) {
        *self.keep_alive.lock().expect("keep_alive lock poisoned") = value;
    }

    /// `-z` / zero-logs-at-startup flag.
    #[must_use]
    pub fn zero_logs(&self) -> bool {
        *self.zero_logs.lock().expect("zero_logs lock poisoned")
    }

    /// Sets the zero-logs flag.
    pub fn set_zero_logs(&self, value: bool) {
        *self.zero_logs.lock().expect("zero_logs lock poisoned") = value;
    }

    /// `LOOPBACK` flag.
    #[must_use]
    pub fn loop_back(&self) -> bool {
        *self.loop_back.lock().expect("loop_back lock poisoned")
    }

    /// Sets the `LOOPBACK` flag.
    pub fn set_loop_back(&self, value: bool) {
        *self.loop_back.lock().expect("loop_back lock poisoned") = value;
    }

    /// `-v` / verbose flag.
    #[must_use]
    pub fn verbose(&self) -> bool {
        *self.verbose.lock().expect("verbose lock poisoned")
    }

    /// Sets the verbose flag.
    pub fn set_verbose(&self, value: bool) {
        *self.verbose.lock().expect("verbose lock poisoned") = value;
    }

    /// Creates and registers a `Console` object under `name`. Rejects a
    /// duplicate console name (`spec.md` §9(d)). The device descriptor is
    /// opened separately, out of this crate's scope; the object starts
    /// with no descriptor until [`crate::link::link`] opens one.
    pub fn add_console(
        &self,
        name: impl Into<String>,
        console: Console,
    ) -> Result<ObjectId, CoreError> {
        let mut arena = self.arena.lock().expect("arena lock poisoned");
        arena.insert(name.into(), ObjectPayload::Console(console), None)
    }

    /// Creates and registers a `LogFile` object. The descriptor is opened
    /// later, when [`crate::link::link`] wires it to its writing console.
    pub fn add_logfile(&self, name: impl Into<String>) -> Result<ObjectId, CoreError> {
        let mut arena = self.arena.lock().expect("arena lock poisoned");
        arena.insert(name.into(), ObjectPayload::LogFile(LogFile), None)
    }

    /// Creates and registers a `Socket` object, synthesizing its name as
    /// `user@host` (`spec.md` §4.3) and installing `endpoint` as its
    /// descriptor in the same construction step, so the object is never
    /// observable through the arena without one ("created already open",
    /// per the glossary).
    pub fn add_socket(
        &self,
        user: &str,
        host: &str,
        endpoint: Box<dyn Endpoint>,
    ) -> Result<ObjectId, CoreError> {
        let name = format!("{user}@{host}");
        let socket = Socket {
            got_iac: false,
            time_last_read: std::time::Instant::now(),
        };
        let mut arena = self.arena.lock().expect("arena lock poisoned");
        arena.insert(name, ObjectPayload::Socket(socket), Some(endpoint))
    }

    /// Looks up an object by its stable id.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<Arc<Object>> {
        self.arena
            .lock()
            .expect("arena lock poisoned")
            .slab
            .get(id.0)
            .cloned()
    }

    /// Looks up an object by variant and name.
    #[must_use]
    pub fn get_by_name(&self, kind: ObjectKind, name: &str) -> Option<ObjectId> {
        self.arena
            .lock()
            .expect("arena lock poisoned")
            .names
            .get(&(kind, name.to_string()))
            .copied()
    }

    /// Removes and returns an object, dropping it from the arena. Used by
    /// [`crate::link::close`] to destroy sockets immediately on close.
    pub fn remove(&self, id: ObjectId) -> Option<Arc<Object>> {
        self.arena.lock().expect("arena lock poisoned").remove(id)
    }

    /// Snapshot of every registered object id, for tests and diagnostics.
    #[must_use]
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.arena
            .lock()
            .expect("arena lock poisoned")
            .slab
            .iter()
            .map(|(key, _)| ObjectId(key))
            .collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
