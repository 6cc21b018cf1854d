use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::http::GovernedClient;
use crate::USER_AGENT;

pub const ROR_API: &str = "https://api.ror.org";
pub const ROR_PREFIX: &str = "https://ror.org/";

/// Research Organization Registry lookups keyed by a funder DOI suffix.
pub struct RorClient {
    client: GovernedClient,
    base_url: String,
}

impl RorClient {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(ROR_API, GovernedClient::new(USER_AGENT)?))
    }

    pub fn with_client(base_url: &str, client: GovernedClient) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// First matching organization id, or `None` when nothing matched or the
    /// service failed. With `trim_prefix` the `https://ror.org/` part is dropped.
    pub async fn lookup(&self, doi_suffix: &str, trim_prefix: bool) -> Option<String> {
        let suffix = doi_suffix.trim();
        if suffix.is_empty() {
            return None;
        }
        let url = format!("{}/organizations?query={}", self.base_url, urlencoding::encode(suffix));
        let val: Value = match self.client.get_json(&url).await {
            Ok(v) => v,
            Err(e) => {
                warn!(suffix, error = %e, "ROR lookup failed");
                return None;
            }
        };
        let id = val["items"][0]["id"].as_str().filter(|s| !s.is_empty())?;
        debug!(suffix, ror = id, "ROR match");
        if trim_prefix {
            Some(id.trim_start_matches(ROR_PREFIX).to_string())
        } else {
            Some(id.to_string())
        }
    }
}
