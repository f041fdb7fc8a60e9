use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::DispatchClient;

pub const EMBED_URL_PATH: &str = "/api/analytics/get-embed-url";
const EMBED_FAILED: &str = "Failed to fetch embed URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedResponse {
    #[serde(rename = "iframeUrl", default)]
    pub iframe_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    dashboard: &'a str,
}

/// Embed-URL lookup on the analytics backend, through its own dispatch client.
pub struct AnalyticsApi {
    client: Arc<DispatchClient>,
}

impl AnalyticsApi {
    pub fn new(client: Arc<DispatchClient>) -> Self { Self { client } }

    pub fn client(&self) -> &Arc<DispatchClient> { &self.client }

    /// Never fails: any error comes back as an empty URL with a fixed message.
    pub async fn embed_url(&self, dashboard: &str) -> EmbedResponse {
        match self.client.post_json::<_, EmbedResponse>(EMBED_URL_PATH, &EmbedRequest { dashboard }).await {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "authkeep::dispatch", "embed url lookup for '{}' failed: {}", dashboard, e);
                EmbedResponse { iframe_url: String::new(), error: Some(EMBED_FAILED.to_string()) }
            }
        }
    }
}
