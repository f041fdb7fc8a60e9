//! Credential storage: a string key/value abstraction with two backends.
//!
//! `FileStore` survives process restarts, `MemoryStore` lives only as long as the
//! process. `DualStore` picks between them from the process-wide `DurabilityMode`,
//! which is read fresh on every operation so a mode switch is seen by every call
//! issued after it.

mod file;
mod memory;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AuthResult;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key under which the durability choice itself is remembered (persistent backend only).
pub const DURABILITY_KEY: &str = "session_durability";

/// Get/set/remove by string key. Values are already-serialized text.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AuthResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AuthResult<()>;
    fn remove(&self, key: &str) -> AuthResult<()>;
    /// Short label used in logs.
    fn label(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityMode {
    #[default]
    Persistent,
    Ephemeral,
}

impl DurabilityMode {
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me { DurabilityMode::Persistent } else { DurabilityMode::Ephemeral }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurabilityMode::Persistent => "persistent",
            DurabilityMode::Ephemeral => "ephemeral",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "persistent" => Some(DurabilityMode::Persistent),
            "ephemeral" => Some(DurabilityMode::Ephemeral),
            _ => None,
        }
    }
}

/// Both backends plus the currently active mode.
pub struct DualStore {
    persistent: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
    mode: RwLock<DurabilityMode>,
}

impl DualStore {
    /// Builds the pair and restores the last durability choice from the persistent backend.
    pub fn new(persistent: Arc<dyn KeyValueStore>, ephemeral: Arc<dyn KeyValueStore>) -> Self {
        let mode = match persistent.get(DURABILITY_KEY) {
            Ok(Some(raw)) => DurabilityMode::parse(&raw).unwrap_or_default(),
            Ok(None) => DurabilityMode::default(),
            Err(e) => {
                warn!(target: "authkeep::storage", "could not read durability mode, using default: {}", e);
                DurabilityMode::default()
            }
        };
        debug!(target: "authkeep::storage", "durability mode restored: {}", mode.as_str());
        Self { persistent, ephemeral, mode: RwLock::new(mode) }
    }

    /// Persistent file backend under `dir` and a fresh in-memory backend.
    pub fn open(dir: impl Into<std::path::PathBuf>) -> AuthResult<Self> {
        let persistent: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir)?);
        let ephemeral: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        Ok(Self::new(persistent, ephemeral))
    }

    pub fn mode(&self) -> DurabilityMode { *self.mode.read() }

    /// Records the mode for every later read/write. Existing data is neither moved nor cleared.
    pub fn set_mode(&self, mode: DurabilityMode) {
        *self.mode.write() = mode;
        if let Err(e) = self.persistent.set(DURABILITY_KEY, mode.as_str()) {
            warn!(target: "authkeep::storage", "could not remember durability mode: {}", e);
        }
        debug!(target: "authkeep::storage", "durability mode set: {}", mode.as_str());
    }

    pub fn backend(&self, mode: DurabilityMode) -> &Arc<dyn KeyValueStore> {
        match mode {
            DurabilityMode::Persistent => &self.persistent,
            DurabilityMode::Ephemeral => &self.ephemeral,
        }
    }

    pub fn active(&self) -> &Arc<dyn KeyValueStore> { self.backend(self.mode()) }

    pub fn get(&self, key: &str) -> AuthResult<Option<String>> { self.active().get(key) }

    pub fn set(&self, key: &str, value: &str) -> AuthResult<()> { self.active().set(key, value) }

    /// Removes `key` from both backends. Failures are logged and never stop the other removal.
    pub fn remove_everywhere(&self, key: &str) {
        for store in [&self.persistent, &self.ephemeral] {
            if let Err(e) = store.remove(key) {
                warn!(target: "authkeep::storage", "remove '{}' from {} failed: {}", key, store.label(), e);
            }
        }
    }
}
