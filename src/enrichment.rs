//! Best-effort related-links enrichment
//!
//! The enrichment service receives the rewritten query and assembled
//! context so it can pre-warm related links and products. Its response is
//! never fed into answer generation, and the call is skipped entirely
//! unless enabled in configuration.

use reqwest::Client;
use tracing::debug;

use crate::config::EnrichmentConfig;

/// Client for the downstream links/products service
#[derive(Clone)]
pub struct EnrichmentClient {
    endpoint: String,
    client: Client,
}

impl EnrichmentClient {
    /// Build the client when enrichment is enabled and an endpoint is set.
    #[must_use]
    pub fn from_config(config: &EnrichmentConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let endpoint = config.endpoint.clone()?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .ok()?;
        Some(Self { endpoint, client })
    }

    /// Fire-and-forget notification. Failures are logged at debug only;
    /// the primary answer never depends on this call.
    pub fn notify(&self, rewritten_query: &str, context: &str) {
        let url = format!("{}/related", self.endpoint);
        let body = serde_json::json!({
            "query": rewritten_query,
            "context": context,
        });
        let client = self.client.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) => debug!("Enrichment call returned {}", response.status()),
                Err(e) => debug!("Enrichment call failed: {e}"),
            }
        });
    }
}
