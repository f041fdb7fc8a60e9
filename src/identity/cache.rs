use std::sync::Arc;

use tracing::{debug, warn};

use super::record::IdentityRecord;
use crate::error::{AuthError, AuthResult};
use crate::storage::DualStore;

pub const IDENTITY_KEY: &str = "user_data";

/// Identity record stored beside the credential, in the same backend.
pub struct IdentityCache {
    store: Arc<DualStore>,
}

impl IdentityCache {
    pub fn new(store: Arc<DualStore>) -> Self { Self { store } }

    pub fn store(&self, identity: &IdentityRecord) -> AuthResult<()> {
        let text = serde_json::to_string(identity).map_err(AuthError::storage)?;
        self.store.set(IDENTITY_KEY, &text)?;
        debug!(target: "authkeep::session", "identity id={} cached in {} backend", identity.id, self.store.mode().as_str());
        Ok(())
    }

    /// A record that no longer parses reads as absent.
    pub fn retrieve(&self) -> Option<IdentityRecord> {
        let raw = match self.store.get(IDENTITY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(target: "authkeep::session", "identity read failed: {}", e);
                return None;
            }
        };
        match serde_json::from_str::<IdentityRecord>(&raw) {
            Ok(rec) => Some(rec),
            Err(e) => {
                warn!(target: "authkeep::session", "cached identity unreadable: {}", e);
                None
            }
        }
    }

    pub fn clear(&self) { self.store.remove_everywhere(IDENTITY_KEY); }
}
