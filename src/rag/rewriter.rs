//! Retrieval-oriented query rewriting

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::llm::CompletionProvider;
use crate::llm::StagePrompt;
use crate::models::ChatMessage;

/// Rewrites the query using recent history to improve retrieval recall.
/// This stage degrades gracefully: retrieval can still proceed on the raw
/// query, so any failure falls back to the original text.
pub struct QueryRewriter {
    provider: Arc<dyn CompletionProvider>,
}

impl QueryRewriter {
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Produce a more specific restatement of the query, or the original
    /// query unchanged when the provider call fails.
    pub async fn rewrite(&self, query: &str, history: &[ChatMessage]) -> String {
        let prompt = StagePrompt::Rewrite { question: query, history };
        match self
            .provider
            .complete(&prompt.system(), &[ChatMessage::user(prompt.render())], 0.0)
            .await
        {
            Ok(raw) => {
                let rewritten = strip_label(&raw).trim().to_string();
                if rewritten.is_empty() {
                    query.to_string()
                } else {
                    debug!("Rewrote query {:?} -> {:?}", query, rewritten);
                    rewritten
                }
            }
            Err(e) => {
                warn!("Query rewrite failed, using original query: {e}");
                query.to_string()
            }
        }
    }
}

/// The model sometimes echoes the instruction label back.
fn strip_label(raw: &str) -> &str {
    let trimmed = raw.trim_start();
    trimmed
        .strip_prefix("Rewritten query:")
        .unwrap_or(trimmed)
}
