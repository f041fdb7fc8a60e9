//! Wiring: one session core shared by the main API client and the analytics client.

use std::sync::Arc;

use tracing::info;

use crate::config::ClientConfig;
use crate::dispatch::{AnalyticsApi, DispatchClient};
use crate::error::AuthResult;
use crate::identity::{HttpAuthApi, SessionCore, SessionManager};
use crate::storage::DualStore;
use crate::surface::{Navigator, Notifier};

pub struct AuthRuntime {
    pub config: ClientConfig,
    pub session: SessionManager,
    pub api: Arc<DispatchClient>,
    pub analytics: AnalyticsApi,
}

impl AuthRuntime {
    /// Opens the persistent store under `config.state_dir` and builds both clients.
    pub fn from_config(config: ClientConfig, navigator: Arc<dyn Navigator>, notifier: Arc<dyn Notifier>) -> AuthResult<Self> {
        let store = Arc::new(DualStore::open(config.state_dir.clone())?);
        Self::with_store(config, store, navigator, notifier)
    }

    pub fn with_store(
        config: ClientConfig,
        store: Arc<DualStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> AuthResult<Self> {
        let core = Arc::new(SessionCore::new(store, &config, navigator, notifier));
        let api = Arc::new(DispatchClient::new("api", &config.api_url, core.clone(), config.request_timeout())?);
        let analytics_client = Arc::new(DispatchClient::new(
            "analytics",
            &config.analytics_url,
            core.clone(),
            config.request_timeout(),
        )?);
        let session = SessionManager::new(core, Arc::new(HttpAuthApi::new(api.clone())));
        info!(target: "authkeep::session", "runtime ready: api={} analytics={}", config.api_url, config.analytics_url);
        Ok(Self { config, session, api, analytics: AnalyticsApi::new(analytics_client) })
    }

    pub fn core(&self) -> &Arc<SessionCore> { self.session.core() }
}
