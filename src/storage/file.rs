use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::error::{AuthError, AuthResult};

const FILE_NAME: &str = "session.json";

/// Durable backend: a single JSON object on disk, rewritten on every change.
pub struct FileStore {
    dir: PathBuf,
    map: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> AuthResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let map = load(&dir.join(FILE_NAME));
        debug!(target: "authkeep::storage", "file store opened at {} ({} keys)", dir.display(), map.len());
        Ok(Self { dir, map: RwLock::new(map) })
    }

    pub fn path(&self) -> PathBuf { self.dir.join(FILE_NAME) }

    // Caller holds the write lock so concurrent writers cannot interleave files.
    fn flush(&self, map: &BTreeMap<String, String>) -> AuthResult<()> {
        let bytes = serde_json::to_vec_pretty(map).map_err(AuthError::storage)?;
        let tmp = self.dir.join(format!("{}.tmp", FILE_NAME));
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, self.path())?;
        Ok(())
    }
}

fn load(path: &Path) -> BTreeMap<String, String> {
    let Ok(bytes) = std::fs::read(path) else { return BTreeMap::new(); };
    match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
        Ok(m) => m,
        Err(e) => {
            warn!(target: "authkeep::storage", "ignoring unreadable {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> AuthResult<Option<String>> { Ok(self.map.read().get(key).cloned()) }

    // Changes are staged on a copy; memory only moves once the file has.
    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        let mut map = self.map.write();
        let mut next = map.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *map = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> AuthResult<()> {
        let mut map = self.map.write();
        if !map.contains_key(key) {
            return Ok(());
        }
        let mut next = map.clone();
        next.remove(key);
        self.flush(&next)?;
        *map = next;
        Ok(())
    }

    fn label(&self) -> &'static str { "file" }
}
