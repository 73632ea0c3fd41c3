//! Embedding API client with bounded retry
//!
//! The raw provider call lives behind [`EmbeddingBackend`];
//! [`EmbeddingClient`] wraps it in the stage retry policy. Retrieval
//! correctness depends on the query embedding, so exhaustion here is fatal
//! rather than degraded.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::EmbeddingsConfig;
use crate::errors::GrainwiseError;
use crate::errors::Stage;
use crate::retry::BoundedCall;
use crate::Result;

/// A raw embedding provider call.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// OpenAI-compatible `/embeddings` endpoint backend
pub struct HttpEmbeddingBackend {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpEmbeddingBackend {
    /// Create a new embedding backend
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(endpoint: String, model: String, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(100)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GrainwiseError::Http(e.to_string()))?;

        Ok(Self {
            endpoint,
            model,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            input: &'a str,
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.endpoint);
        debug!("Calling embeddings API: {}", url);

        let request = EmbeddingRequest {
            input: text,
            model: &self.model,
        };

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| GrainwiseError::transient(Stage::Embed, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(GrainwiseError::Configuration(format!(
                    "embedding API rejected credentials: {status}"
                )));
            }
            return Err(GrainwiseError::transient(
                Stage::Embed,
                format!("embedding API error ({status}): {error_text}"),
            ));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| GrainwiseError::transient(Stage::Embed, format!("parse failure: {e}")))?;

        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| GrainwiseError::transient(Stage::Embed, "no embedding in response"))
    }
}

/// Embedding client applying the bounded-call policy to a backend
pub struct EmbeddingClient {
    backend: Arc<dyn EmbeddingBackend>,
    policy: BoundedCall,
}

impl EmbeddingClient {
    /// Wrap a backend with an explicit retry policy
    #[must_use]
    pub fn new(backend: Arc<dyn EmbeddingBackend>, policy: BoundedCall) -> Self {
        Self { backend, policy }
    }

    /// Build the client from configuration. The overall deadline bounds
    /// the stage; each attempt gets the full remaining window.
    pub fn from_config(config: &EmbeddingsConfig) -> Result<Self> {
        let backend = HttpEmbeddingBackend::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.api_key.clone(),
        )?;
        let deadline = Duration::from_secs(config.timeout_secs);
        let policy = BoundedCall::new(config.max_retries + 1, deadline, deadline);
        Ok(Self::new(Arc::new(backend), policy))
    }

    /// Generate the query embedding under the stage retry policy
    ///
    /// # Errors
    /// - `StageTimeout` when the overall deadline elapses
    /// - `StageTransient` when all attempts fail
    /// - `Configuration` when the provider rejects credentials
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let backend = self.backend.clone();
        let text = text.to_string();
        self.policy
            .run(Stage::Embed, move || {
                let backend = backend.clone();
                let text = text.clone();
                async move { backend.embed(&text).await }
            })
            .await
    }
}
