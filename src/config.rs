//! Client configuration: defaults, then an optional JSON file, then environment.
//! Binaries layer their own command-line flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

pub const ENV_API_URL: &str = "AUTHKEEP_API_URL";
pub const ENV_ANALYTICS_URL: &str = "AUTHKEEP_ANALYTICS_URL";
pub const ENV_STATE_DIR: &str = "AUTHKEEP_STATE_DIR";
pub const ENV_CLOCK_SKEW_SECS: &str = "AUTHKEEP_CLOCK_SKEW_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "AUTHKEEP_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the main API (login/logout live here).
    #[serde(default = "ClientConfig::default_api_url")]
    pub api_url: String,
    /// Base URL of the analytics API; shares the session with the main client.
    #[serde(default = "ClientConfig::default_analytics_url")]
    pub analytics_url: String,
    /// Directory of the persistent credential store.
    #[serde(default = "ClientConfig::default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "ClientConfig::default_login_path")]
    pub login_path: String,
    #[serde(default = "ClientConfig::default_unauthorized_path")]
    pub unauthorized_path: String,
    /// A credential is treated as expired this many seconds before its `exp`.
    #[serde(default = "ClientConfig::default_clock_skew_secs")]
    pub clock_skew_secs: u64,
    #[serde(default = "ClientConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    fn default_api_url() -> String { "http://localhost:3000".to_string() }
    fn default_analytics_url() -> String { "http://localhost:8080".to_string() }
    fn default_state_dir() -> PathBuf {
        std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map(|h| PathBuf::from(h).join(".authkeep"))
            .unwrap_or_else(|_| PathBuf::from(".authkeep"))
    }
    fn default_login_path() -> String { "/login".to_string() }
    fn default_unauthorized_path() -> String { "/unauthorized".to_string() }
    fn default_clock_skew_secs() -> u64 { 30 }
    fn default_request_timeout_secs() -> u64 { 30 }

    pub fn clock_skew(&self) -> Duration { Duration::from_secs(self.clock_skew_secs) }

    pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }

    /// Defaults, overlaid by `path` (when given and present), overlaid by environment.
    pub fn load(path: Option<&Path>) -> AuthResult<Self> {
        let mut cfg = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok())?;
        debug!(target: "authkeep::config", "config loaded: api={} analytics={} state_dir={}", cfg.api_url, cfg.analytics_url, cfg.state_dir.display());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> AuthResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| AuthError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_slice(&bytes).map_err(|e| AuthError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Applies overrides from `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F) -> AuthResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_API_URL) { self.api_url = v; }
        if let Some(v) = lookup(ENV_ANALYTICS_URL) { self.analytics_url = v; }
        if let Some(v) = lookup(ENV_STATE_DIR) { self.state_dir = PathBuf::from(v); }
        if let Some(v) = lookup(ENV_CLOCK_SKEW_SECS) {
            self.clock_skew_secs = parse_secs(ENV_CLOCK_SKEW_SECS, &v)?;
        }
        if let Some(v) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs = parse_secs(ENV_REQUEST_TIMEOUT_SECS, &v)?;
        }
        Ok(())
    }
}

fn parse_secs(name: &str, raw: &str) -> AuthResult<u64> {
    raw.trim().parse::<u64>().map_err(|_| AuthError::Config(format!("{} must be a whole number of seconds, got '{}'", name, raw)))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: Self::default_api_url(),
            analytics_url: Self::default_analytics_url(),
            state_dir: Self::default_state_dir(),
            login_path: Self::default_login_path(),
            unauthorized_path: Self::default_unauthorized_path(),
            clock_skew_secs: Self::default_clock_skew_secs(),
            request_timeout_secs: Self::default_request_timeout_secs(),
        }
    }
}
