//! Session state machine: bootstrap from storage, login, logout, and invalidation.
//!
//! `SessionCore` is the shared half. Dispatch clients hold it to read the credential
//! and to trigger invalidation; `SessionManager` adds the remote login/logout calls.
//! Every transition that clears or establishes a session runs under one mutex, so
//! concurrent teardowns serialize and the later ones find nothing left to do.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::authorizer::Access;
use super::cache::IdentityCache;
use super::provider::{AuthApi, LoginRequest, LoginResponse};
use super::record::IdentityRecord;
use super::token::TokenService;
use crate::config::ClientConfig;
use crate::error::{AuthError, AuthResult, INVALID_CREDENTIALS};
use crate::storage::DualStore;
use crate::surface::{Navigator, Notifier};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unauthenticated,
    Initializing,
    Authenticated(IdentityRecord),
}

impl SessionState {
    pub fn identity(&self) -> Option<&IdentityRecord> {
        match self {
            SessionState::Authenticated(id) => Some(id),
            _ => None,
        }
    }
}

/// Read model handed to the shell.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub loading: bool,
    pub error: Option<String>,
}

struct Status {
    state: SessionState,
    loading: bool,
    error: Option<String>,
}

pub struct SessionCore {
    tokens: TokenService,
    identities: IdentityCache,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    login_path: String,
    unauthorized_path: String,
    status: RwLock<Status>,
    transition: Mutex<()>,
    teardowns: AtomicU64,
}

impl SessionCore {
    pub fn new(
        store: Arc<DualStore>,
        cfg: &ClientConfig,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            tokens: TokenService::new(store.clone(), cfg.clock_skew()),
            identities: IdentityCache::new(store),
            navigator,
            notifier,
            login_path: cfg.login_path.clone(),
            unauthorized_path: cfg.unauthorized_path.clone(),
            status: RwLock::new(Status { state: SessionState::Unauthenticated, loading: false, error: None }),
            transition: Mutex::new(()),
            teardowns: AtomicU64::new(0),
        }
    }

    pub fn tokens(&self) -> &TokenService { &self.tokens }

    pub fn identities(&self) -> &IdentityCache { &self.identities }

    pub fn navigator(&self) -> &Arc<dyn Navigator> { &self.navigator }

    pub fn notifier(&self) -> &Arc<dyn Notifier> { &self.notifier }

    pub fn login_path(&self) -> &str { &self.login_path }

    pub fn unauthorized_path(&self) -> &str { &self.unauthorized_path }

    pub fn state(&self) -> SessionState { self.status.read().state.clone() }

    pub fn snapshot(&self) -> SessionSnapshot {
        let st = self.status.read();
        SessionSnapshot { state: st.state.clone(), loading: st.loading, error: st.error.clone() }
    }

    pub fn current_identity(&self) -> Option<IdentityRecord> { self.state().identity().cloned() }

    pub fn is_authenticated(&self) -> bool { matches!(self.state(), SessionState::Authenticated(_)) }

    /// Number of teardowns that actually removed a live session.
    pub fn teardown_count(&self) -> u64 { self.teardowns.load(Ordering::SeqCst) }

    pub fn clear_error(&self) { self.status.write().error = None; }

    fn set_loading(&self, loading: bool) { self.status.write().loading = loading; }

    /// Reconciles stored credential and identity into a session. Never surfaces errors:
    /// anything that does not check out leaves both backends empty.
    pub fn bootstrap(&self) -> SessionState {
        let _guard = self.transition.lock();
        {
            let mut st = self.status.write();
            st.state = SessionState::Initializing;
            st.loading = true;
        }
        let outcome = self.reconcile();
        let state = match outcome {
            Ok(identity) => {
                if let Some(token) = self.tokens.credential() {
                    self.tokens.activate(&token);
                }
                info!(target: "authkeep::session", "session restored for user id={} role={}", identity.id, identity.role);
                SessionState::Authenticated(identity)
            }
            Err(e) => {
                if e.is_session_fatal() {
                    debug!(target: "authkeep::session", "no usable stored session ({}), clearing", e.code_str());
                } else {
                    warn!(target: "authkeep::session", "stored session could not be restored, clearing: {}", e);
                }
                self.clear_locked();
                SessionState::Unauthenticated
            }
        };
        let mut st = self.status.write();
        st.state = state.clone();
        st.loading = false;
        state
    }

    fn reconcile(&self) -> AuthResult<IdentityRecord> {
        let now = chrono::Utc::now().timestamp();
        if let Some(identity) = self.identities.retrieve() {
            if self.tokens.is_valid_at(now) {
                return Ok(identity);
            }
        }
        // slow path: a credential without its identity (e.g. the identity write was lost)
        let claims = self.tokens.live_claims_at(now)?;
        let identity = claims.to_identity()?;
        self.identities.store(&identity)?;
        debug!(target: "authkeep::session", "identity rebuilt from credential claims");
        Ok(identity)
    }

    /// Stores a fresh login result. Any remnant of an earlier session goes first so the
    /// inactive backend never keeps a stale credential.
    fn establish(&self, resp: &LoginResponse) -> AuthResult<IdentityRecord> {
        let _guard = self.transition.lock();
        self.tokens.clear_credential();
        self.identities.clear();
        let written = self
            .tokens
            .set_credential(&resp.token)
            .and_then(|_| match &resp.refresh_token {
                Some(r) => self.tokens.set_refresh_token(r),
                None => Ok(()),
            })
            .and_then(|_| self.identities.store(&resp.identity));
        if let Err(e) = written {
            warn!(target: "authkeep::session", "login succeeded remotely but could not be stored: {}", e);
            self.clear_locked();
            self.status.write().state = SessionState::Unauthenticated;
            return Err(e);
        }
        self.tokens.activate(&resp.token);
        self.status.write().state = SessionState::Authenticated(resp.identity.clone());
        info!(
            target: "authkeep::session",
            "login ok user id={} role={} durability={}",
            resp.identity.id,
            resp.identity.role,
            self.tokens.store().mode().as_str()
        );
        Ok(resp.identity.clone())
    }

    // Caller holds `transition`. Returns true if there was a live session to remove.
    fn clear_locked(&self) -> bool {
        let was_live = self.tokens.active_header().is_some()
            || matches!(self.status.read().state, SessionState::Authenticated(_));
        self.tokens.clear_credential();
        self.identities.clear();
        self.status.write().state = SessionState::Unauthenticated;
        if was_live {
            self.teardowns.fetch_add(1, Ordering::SeqCst);
        }
        was_live
    }

    /// Local teardown without navigation or notice.
    pub fn teardown(&self) -> bool {
        let _guard = self.transition.lock();
        self.clear_locked()
    }

    /// Reaction to an authorization failure on any client. Safe to call repeatedly and
    /// concurrently: only the first call finds a session, and navigation happens only
    /// when the user agent is not already on the login surface.
    pub fn invalidate(&self) {
        let _guard = self.transition.lock();
        if self.clear_locked() {
            info!(target: "authkeep::session", "session invalidated after authorization failure");
        } else {
            debug!(target: "authkeep::session", "invalidate on an already cleared session");
        }
        if self.navigator.current_path() != self.login_path {
            self.navigator.navigate(&self.login_path);
        }
    }
}

/// Orchestrates the remote half of login/logout around a shared `SessionCore`.
pub struct SessionManager {
    core: Arc<SessionCore>,
    api: Arc<dyn AuthApi>,
}

impl SessionManager {
    pub fn new(core: Arc<SessionCore>, api: Arc<dyn AuthApi>) -> Self { Self { core, api } }

    pub fn core(&self) -> &Arc<SessionCore> { &self.core }

    pub fn bootstrap(&self) -> SessionState { self.core.bootstrap() }

    pub fn state(&self) -> SessionState { self.core.state() }

    pub fn snapshot(&self) -> SessionSnapshot { self.core.snapshot() }

    pub fn current_identity(&self) -> Option<IdentityRecord> { self.core.current_identity() }

    pub fn is_authenticated(&self) -> bool { self.core.is_authenticated() }

    pub fn clear_error(&self) { self.core.clear_error() }

    /// Logs in. The durability mode is switched before the remote call so the first write
    /// lands in the right backend; a rejected login puts the previous mode back and leaves
    /// stored state alone.
    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> AuthResult<IdentityRecord> {
        let core = &self.core;
        {
            let mut st = core.status.write();
            st.loading = true;
            st.error = None;
        }
        let previous_mode = core.tokens.store().mode();
        core.tokens.set_persistent(remember_me);

        let req = LoginRequest { email: email.to_string(), password: password.to_string() };
        let result = match self.api.login(&req).await {
            Ok(resp) => self.on_store(move |core| core.establish(&resp)).await,
            Err(e) => {
                debug!(target: "authkeep::session", "login rejected: {}", e.code_str());
                core.tokens.set_durability_mode(previous_mode);
                Err(AuthError::RemoteAuthFailure)
            }
        };

        match &result {
            Ok(_) => core.notifier.success("Login successful"),
            Err(AuthError::RemoteAuthFailure) => {
                core.status.write().error = Some(INVALID_CREDENTIALS.to_string());
                core.notifier.error(INVALID_CREDENTIALS);
            }
            Err(e) => {
                let msg = e.user_message();
                core.status.write().error = Some(msg.to_string());
                core.notifier.error(msg);
            }
        }
        core.set_loading(false);
        result
    }

    /// Ends the session. The remote call is best effort; local teardown always happens.
    pub async fn logout(&self) {
        self.core.set_loading(true);
        if let Err(e) = self.api.logout().await {
            debug!(target: "authkeep::session", "remote logout failed, continuing locally: {}", e);
        }
        if let Err(e) = self.on_store(|core| Ok(core.teardown())).await {
            warn!(target: "authkeep::session", "background teardown failed, clearing inline: {}", e);
            self.core.teardown();
        }
        info!(target: "authkeep::session", "logged out");
        self.core.notifier.success("Logged out successfully");
        self.core.set_loading(false);
    }

    // Backend writes may hit the filesystem, so they run on the blocking pool.
    async fn on_store<T, F>(&self, f: F) -> AuthResult<T>
    where
        F: FnOnce(&SessionCore) -> AuthResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let core = self.core.clone();
        tokio::task::spawn_blocking(move || f(core.as_ref())).await.map_err(AuthError::storage)?
    }

    /// Same teardown as an authorization failure, for callers that detect it themselves.
    pub fn invalidate(&self) { self.core.invalidate() }

    pub fn require_role(&self, role: Option<&str>) -> Access { super::authorizer::require_role(&self.core, role) }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
