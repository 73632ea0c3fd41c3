//! Observability run recording
//!
//! Every pipeline run is recorded to an external sink as a named run with
//! stage metadata. Recording is fire-and-forget: sink failures are logged
//! and never affect the caller-visible output, and an unconfigured sink
//! degrades to a no-op.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use tracing::warn;
use uuid::Uuid;

use crate::config::TracingConfig;
use crate::errors::GrainwiseError;
use crate::models::PipelineResult;
use crate::Result;

/// One recorded pipeline execution. Write-once; owned by the recorder.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRun {
    pub id: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub input: String,
    pub output: String,
    pub metadata: serde_json::Value,
}

impl TraceRun {
    /// Associate a finalized result with a fresh run identifier.
    #[must_use]
    pub fn from_result(result: &PipelineResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "chat-pipeline".to_string(),
            timestamp: Utc::now(),
            input: result.metadata.input.clone(),
            output: result.metadata.output.clone(),
            metadata: serde_json::json!({
                "response_type": result.metadata.response_type,
                "context_document_count": result.metadata.context_document_count,
                "rewritten_query": result.metadata.rewritten_query,
            }),
        }
    }
}

/// Destination for trace runs.
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn record(&self, run: &TraceRun) -> Result<()>;
}

/// Sink used when observability credentials are absent.
pub struct NoopSink;

#[async_trait]
impl TraceSink for NoopSink {
    async fn record(&self, _run: &TraceRun) -> Result<()> {
        Ok(())
    }
}

/// HTTP sink posting runs to the configured observability endpoint
pub struct HttpTraceSink {
    endpoint: String,
    public_key: String,
    secret_key: String,
    client: Client,
}

impl HttpTraceSink {
    pub fn new(endpoint: String, public_key: String, secret_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| GrainwiseError::Http(e.to_string()))?;
        Ok(Self {
            endpoint,
            public_key,
            secret_key,
            client,
        })
    }
}

#[async_trait]
impl TraceSink for HttpTraceSink {
    async fn record(&self, run: &TraceRun) -> Result<()> {
        let url = format!("{}/api/public/runs", self.endpoint);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(run)
            .send()
            .await
            .map_err(|e| GrainwiseError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GrainwiseError::Http(format!(
                "trace sink returned {}",
                response.status()
            )));
        }
        debug!("Recorded trace run {}", run.id);
        Ok(())
    }
}

/// Fire-and-forget recorder decoupled from the request success path
#[derive(Clone)]
pub struct TraceRecorder {
    sink: Arc<dyn TraceSink>,
}

impl TraceRecorder {
    #[must_use]
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self { sink }
    }

    /// Build from configuration. Missing credentials degrade to a no-op
    /// sink with a single startup warning.
    pub fn from_config(config: &TracingConfig) -> Result<Self> {
        if config.is_configured() {
            let sink = HttpTraceSink::new(
                config.endpoint.clone().unwrap_or_default(),
                config.public_key.clone().unwrap_or_default(),
                config.secret_key.clone().unwrap_or_default(),
            )?;
            Ok(Self::new(Arc::new(sink)))
        } else {
            warn!("Observability sink not configured; trace recording disabled");
            Ok(Self::new(Arc::new(NoopSink)))
        }
    }

    /// Record a finalized result without blocking the caller and return
    /// the run identifier for out-of-band reporting. Sink failures are
    /// swallowed and logged.
    pub fn record(&self, result: &PipelineResult) -> Uuid {
        let run = TraceRun::from_result(result);
        let id = run.id;
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.record(&run).await {
                warn!("Failed to record trace run {}: {e}", run.id);
            }
        });
        id
    }
}
