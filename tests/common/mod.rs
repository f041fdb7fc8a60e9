#![allow(dead_code)]

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;

use authkeep::identity::{IDENTITY_KEY, TOKEN_KEY};
use authkeep::storage::{DualStore, FileStore, KeyValueStore, MemoryStore};
use authkeep::surface::{MemoryNavigator, NoticeLog};
use authkeep::{AuthRuntime, ClientConfig};

pub struct Harness {
    pub runtime: AuthRuntime,
    pub persistent: Arc<FileStore>,
    pub ephemeral: Arc<MemoryStore>,
    pub nav: Arc<MemoryNavigator>,
    pub notices: Arc<NoticeLog>,
}

impl Harness {
    pub fn backends_empty(&self) -> bool {
        let p: &dyn KeyValueStore = self.persistent.as_ref();
        let e: &dyn KeyValueStore = self.ephemeral.as_ref();
        [p, e].iter().all(|s| s.get(TOKEN_KEY).unwrap().is_none() && s.get(IDENTITY_KEY).unwrap().is_none())
    }
}

pub fn config(api_url: &str, analytics_url: &str, state_dir: &std::path::Path) -> ClientConfig {
    ClientConfig {
        api_url: api_url.to_string(),
        analytics_url: analytics_url.to_string(),
        state_dir: state_dir.to_path_buf(),
        request_timeout_secs: 5,
        ..ClientConfig::default()
    }
}

/// Runtime over a file store in `state_dir` and a fresh memory store, starting on `/dashboard`.
pub fn harness(api_url: &str, analytics_url: &str, state_dir: &std::path::Path) -> Harness {
    let persistent = Arc::new(FileStore::open(state_dir).unwrap());
    let ephemeral = Arc::new(MemoryStore::new());
    let store = Arc::new(DualStore::new(persistent.clone(), ephemeral.clone()));
    let nav = Arc::new(MemoryNavigator::new("/dashboard"));
    let notices = Arc::new(NoticeLog::new());
    let runtime = AuthRuntime::with_store(config(api_url, analytics_url, state_dir), store, nav.clone(), notices.clone()).unwrap();
    Harness { runtime, persistent, ephemeral, nav, notices }
}

pub fn jwt(sub: i64, role: &str, exp_offset_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + exp_offset_secs;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = json!({"sub": sub.to_string(), "email": format!("u{}@example.com", sub), "name": format!("User {}", sub), "role": role, "exp": exp});
    format!("{}.{}.signature", header, URL_SAFE_NO_PAD.encode(payload.to_string()))
}

pub fn login_body(token: &str, id: i64, role: &str) -> String {
    json!({
        "token": token,
        "refreshToken": "renewal",
        "user_account": {
            "id": id,
            "email": format!("u{}@example.com", id),
            "name": format!("User {}", id),
            "role": role,
            "staff_id": 40 + id,
            "staff": {"id": 40 + id, "position": "analyst", "desk": {"floor": 3}}
        }
    })
    .to_string()
}

pub async fn mock_login(server: &mut mockito::ServerGuard, token: &str, id: i64, role: &str) -> mockito::Mock {
    server
        .mock("POST", "/api/auth/login")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(login_body(token, id, role))
        .create_async()
        .await
}
