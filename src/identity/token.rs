use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use super::claims::{decode_claims, decode_expiry, is_live, ClaimSet};
use crate::error::{AuthError, AuthResult};
use crate::storage::{DualStore, DurabilityMode};

pub const TOKEN_KEY: &str = "auth_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Owns the bearer credential: storage, offline validity, and the process-wide
/// header state that every dispatch client consults.
pub struct TokenService {
    store: Arc<DualStore>,
    skew: Duration,
    active: RwLock<Option<String>>,
}

impl TokenService {
    pub fn new(store: Arc<DualStore>, skew: Duration) -> Self {
        Self { store, skew, active: RwLock::new(None) }
    }

    pub fn store(&self) -> &Arc<DualStore> { &self.store }

    pub fn set_durability_mode(&self, mode: DurabilityMode) { self.store.set_mode(mode) }

    pub fn set_persistent(&self, persistent: bool) {
        self.set_durability_mode(DurabilityMode::from_remember_me(persistent))
    }

    pub fn is_persistent(&self) -> bool { self.store.mode() == DurabilityMode::Persistent }

    pub fn set_credential(&self, token: &str) -> AuthResult<()> {
        self.store.set(TOKEN_KEY, token)?;
        debug!(target: "authkeep::token", "credential stored in {} backend", self.store.mode().as_str());
        Ok(())
    }

    pub fn credential(&self) -> Option<String> {
        match self.store.get(TOKEN_KEY) {
            Ok(v) => v.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                debug!(target: "authkeep::token", "credential read failed: {}", e);
                None
            }
        }
    }

    pub fn set_refresh_token(&self, token: &str) -> AuthResult<()> { self.store.set(REFRESH_TOKEN_KEY, token) }

    pub fn refresh_token(&self) -> Option<String> { self.store.get(REFRESH_TOKEN_KEY).ok().flatten() }

    /// Removes the credential and renewal artifact from both backends and drops the active header.
    pub fn clear_credential(&self) {
        self.store.remove_everywhere(TOKEN_KEY);
        self.store.remove_everywhere(REFRESH_TOKEN_KEY);
        self.deactivate();
        debug!(target: "authkeep::token", "credential cleared from all backends");
    }

    pub fn claims(&self) -> AuthResult<ClaimSet> {
        let token = self.credential().ok_or_else(|| AuthError::decode("no credential stored"))?;
        decode_claims(&token)
    }

    fn skew_secs(&self) -> i64 { i64::try_from(self.skew.as_secs()).unwrap_or(i64::MAX) }

    /// Expiry-only check: profile claims play no part in whether the credential is live.
    pub fn check_live_at(&self, now: i64) -> AuthResult<()> {
        let token = self.credential().ok_or_else(|| AuthError::decode("no credential stored"))?;
        if !is_live(decode_expiry(&token)?, now, self.skew_secs()) {
            return Err(AuthError::CredentialExpired);
        }
        Ok(())
    }

    /// Like `claims` but an expired credential is an error.
    pub fn live_claims_at(&self, now: i64) -> AuthResult<ClaimSet> {
        self.check_live_at(now)?;
        self.claims()
    }

    pub fn is_valid_at(&self, now: i64) -> bool { self.check_live_at(now).is_ok() }

    /// Offline check; fail-closed on anything that does not decode.
    pub fn is_valid(&self) -> bool { self.is_valid_at(chrono::Utc::now().timestamp()) }

    /// Marks `token` as the credential the current session injects into outbound requests.
    pub fn activate(&self, token: &str) { *self.active.write() = Some(token.to_string()); }

    pub fn deactivate(&self) { *self.active.write() = None; }

    pub fn active_header(&self) -> Option<String> { self.active.read().clone() }
}
