//! Grounded answer generation

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::llm::CompletionProvider;
use crate::llm::StagePrompt;
use crate::llm::TokenStream;
use crate::models::ChatMessage;
use crate::Result;

/// Produces the persona-styled answer from assembled context. One
/// non-streaming call finalizes the answer for result capture; a separate
/// streaming pass re-issues the finalized text for incremental delivery.
pub struct AnswerGenerator {
    provider: Arc<dyn CompletionProvider>,
    temperature: f32,
}

impl AnswerGenerator {
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>, temperature: f32) -> Self {
        Self {
            provider,
            temperature,
        }
    }

    /// Generate the grounded answer. Failure here is fatal for the
    /// relevant branch; there is no cached fallback answer.
    pub async fn generate(
        &self,
        history: &[ChatMessage],
        context: &str,
        question: &str,
    ) -> Result<String> {
        let prompt = StagePrompt::Generate {
            question,
            history,
            context,
        };
        let answer = self
            .provider
            .complete(
                &prompt.system(),
                &[ChatMessage::user(prompt.render())],
                self.temperature,
            )
            .await?;

        // Prompt-level formatting is not guaranteed; surface drift in logs
        // without failing the request.
        if !answer.contains("### ") {
            warn!("Generated answer is missing section headings");
        }
        debug!("Generated answer ({} chars)", answer.len());
        Ok(answer)
    }

    /// Streaming delivery pass over an already-finalized answer.
    pub async fn stream_finalized(
        &self,
        history: &[ChatMessage],
        answer: &str,
    ) -> Result<TokenStream> {
        let prompt = StagePrompt::Restate { history, answer };
        self.provider
            .complete_streaming(
                &prompt.system(),
                &[ChatMessage::user(prompt.render())],
                0.0,
            )
            .await
    }
}
