//! Outbound HTTP clients sharing one session.
//!
//! Each `DispatchClient` wraps its own `reqwest::Client` and base URL. The bearer
//! header is attached immediately before the request is executed, from whatever
//! credential the token service holds at that moment, and a 401 on any client
//! triggers session invalidation.

mod analytics;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::identity::SessionCore;

pub use analytics::{AnalyticsApi, EmbedResponse, EMBED_URL_PATH};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct DispatchClient {
    name: String,
    base: Url,
    http: reqwest::Client,
    core: Arc<SessionCore>,
}

impl DispatchClient {
    pub fn new(name: &str, base: &str, core: Arc<SessionCore>, timeout: Duration) -> AuthResult<Self> {
        let base = Url::parse(base).map_err(|e| AuthError::Config(format!("invalid base URL '{}': {}", base, e)))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AuthError::transport)?;
        Ok(Self { name: name.to_string(), base, http, core })
    }

    pub fn url(&self, path: &str) -> AuthResult<Url> {
        self.base.join(path).map_err(|e| AuthError::Config(format!("invalid path '{}': {}", path, e)))
    }

    pub fn request(&self, method: Method, path: &str) -> AuthResult<RequestBuilder> {
        Ok(self.http.request(method, self.url(path)?))
    }

    pub fn get(&self, path: &str) -> AuthResult<RequestBuilder> { self.request(Method::GET, path) }

    pub fn post(&self, path: &str) -> AuthResult<RequestBuilder> { self.request(Method::POST, path) }

    /// Sends with both session hooks applied. A 401 comes back as `AuthError::Unauthorized`
    /// after the session has been dealt with; other statuses are returned as-is.
    pub async fn send(&self, rb: RequestBuilder) -> AuthResult<Response> {
        let mut req = rb.build().map_err(AuthError::transport)?;
        // read at send time, never cached on the client
        let sent_with = self.core.tokens().credential();
        if let Some(token) = &sent_with {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| AuthError::decode("credential is not a valid header value"))?;
            req.headers_mut().insert(AUTHORIZATION, value);
        }
        let request_id = Uuid::new_v4().to_string();
        if let Ok(v) = HeaderValue::from_str(&request_id) {
            req.headers_mut().insert(REQUEST_ID_HEADER, v);
        }
        trace!(
            target: "authkeep::dispatch",
            client = %self.name,
            method = %req.method(),
            url = %req.url(),
            request_id = %request_id,
            authorized = sent_with.is_some(),
            "sending request"
        );

        let resp = self.http.execute(req).await.map_err(AuthError::from)?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            self.on_unauthorized(sent_with.as_deref(), &request_id);
            return Err(AuthError::Unauthorized);
        }
        Ok(resp)
    }

    /// Sends without touching the session: no bearer header and no reaction to 401.
    pub async fn send_anonymous(&self, rb: RequestBuilder) -> AuthResult<Response> {
        let req = rb.build().map_err(AuthError::transport)?;
        debug!(target: "authkeep::dispatch", client = %self.name, url = %req.url(), "sending anonymous request");
        self.http.execute(req).await.map_err(AuthError::from)
    }

    fn on_unauthorized(&self, sent_with: Option<&str>, request_id: &str) {
        match self.core.tokens().active_header() {
            // A newer session replaced the one this request belonged to.
            Some(active) if Some(active.as_str()) != sent_with => {
                debug!(target: "authkeep::dispatch", client = %self.name, request_id = %request_id, "late 401 for a superseded credential ignored");
            }
            _ => {
                warn!(target: "authkeep::dispatch", client = %self.name, request_id = %request_id, "401 received, invalidating session");
                self.core.invalidate();
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AuthResult<T> {
        let resp = self.send(self.get(path)?).await?;
        json_body(resp).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> AuthResult<T> {
        let resp = self.send(self.post(path)?.json(body)).await?;
        json_body(resp).await
    }
}

async fn json_body<T: DeserializeOwned>(resp: Response) -> AuthResult<T> {
    let status = resp.status();
    if !status.is_success() {
        return Err(AuthError::Http { status: status.as_u16() });
    }
    resp.json::<T>().await.map_err(AuthError::transport)
}
