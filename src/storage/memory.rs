use std::collections::HashMap;

use parking_lot::RwLock;

use super::KeyValueStore;
use crate::error::AuthResult;

/// Session-scoped backend: gone when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AuthResult<Option<String>> { Ok(self.map.read().get(key).cloned()) }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AuthResult<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn label(&self) -> &'static str { "memory" }
}
