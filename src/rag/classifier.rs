//! Relevance classification

use std::sync::Arc;

use tracing::debug;

use crate::llm::CompletionProvider;
use crate::llm::StagePrompt;
use crate::models::ChatMessage;
use crate::models::RelevanceLabel;
use crate::Result;

/// Labels each query into a handling branch with a single deterministic
/// completion call. Classification is mandatory for every request, so
/// provider failures propagate to the orchestrator.
pub struct RelevanceClassifier {
    provider: Arc<dyn CompletionProvider>,
}

impl RelevanceClassifier {
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Classify the query given recent history.
    ///
    /// Unrecognized model output maps to `NotRelevant`; the pipeline never
    /// fails open into the retrieval branch.
    pub async fn classify(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<RelevanceLabel> {
        let prompt = StagePrompt::Classify { question: query, history };
        let raw = self
            .provider
            .complete(&prompt.system(), &[ChatMessage::user(prompt.render())], 0.0)
            .await?;
        let label = RelevanceLabel::parse(&raw);
        debug!("Classified query as {:?} (raw: {:?})", label, raw.trim());
        Ok(label)
    }
}
