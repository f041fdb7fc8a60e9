use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::record::IdentityRecord;
use crate::dispatch::DispatchClient;
use crate::error::{AuthError, AuthResult};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login body. Field names follow the backend's wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    #[serde(alias = "credential", alias = "access_token")]
    pub token: String,
    #[serde(rename = "refreshToken", alias = "refresh_token", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(rename = "user_account", alias = "identity", alias = "user")]
    pub identity: IdentityRecord,
}

/// Remote login/logout endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, req: &LoginRequest) -> AuthResult<LoginResponse>;
    /// Sent with the current credential attached; any response is acceptable.
    async fn logout(&self) -> AuthResult<()>;
}

/// `AuthApi` over the main API's dispatch client.
pub struct HttpAuthApi {
    client: Arc<DispatchClient>,
}

impl HttpAuthApi {
    pub fn new(client: Arc<DispatchClient>) -> Self { Self { client } }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, req: &LoginRequest) -> AuthResult<LoginResponse> {
        // Login bypasses the session hooks: a rejected password must not tear down
        // whatever session is currently live.
        let rb = self.client.post(LOGIN_PATH)?.json(req);
        let resp = self.client.send_anonymous(rb).await?;
        let status = resp.status();
        if !status.is_success() {
            // body is not inspected, remote wording never reaches the user
            debug!(target: "authkeep::session", "login endpoint answered HTTP {}", status.as_u16());
            return Err(AuthError::RemoteAuthFailure);
        }
        resp.json::<LoginResponse>().await.map_err(|e| AuthError::Transport(format!("login response: {}", e)))
    }

    async fn logout(&self) -> AuthResult<()> {
        let rb = self.client.post(LOGOUT_PATH)?;
        let resp = self.client.send(rb).await?;
        if !resp.status().is_success() {
            return Err(AuthError::RemoteLogoutFailure(format!("HTTP {}", resp.status().as_u16())));
        }
        Ok(())
    }
}
