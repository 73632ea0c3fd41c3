//! Pipeline orchestration
//!
//! One stateless execution per request:
//! `Start -> Classified -> {ShortCircuited | Retrieving -> Retrieved ->
//! Generating} -> Traced -> Streaming -> Done`. Embeddings and vector
//! search run only on the relevant branch, and exactly one answer
//! generation call happens per relevant request.

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::config::AppConfig;
use crate::embeddings::EmbeddingClient;
use crate::enrichment::EnrichmentClient;
use crate::errors::GrainwiseError;
use crate::llm::CompletionClient;
use crate::llm::CompletionProvider;
use crate::llm::StagePrompt;
use crate::llm::StreamingAnswer;
use crate::models::ChatMessage;
use crate::models::PipelineResult;
use crate::models::RelevanceLabel;
use crate::models::ResponseType;
use crate::models::Role;
use crate::rag::assemble_context;
use crate::rag::AnswerGenerator;
use crate::rag::QueryRewriter;
use crate::rag::RelevanceClassifier;
use crate::store::PgVectorStore;
use crate::store::VectorIndex;
use crate::trace::TraceRecorder;
use crate::Result;

/// Canned reply for inappropriate input. No model call is spent on it.
pub const GUARDRAIL_REPLY: &str = "I'm here to help with woodworking, and I can't engage with \
that. If you have a question about joinery, finishing, tools, or materials, I'm glad to help.";

/// A finalized result together with its trace run identifier. The run id
/// travels as a side channel (response header), never inside the token
/// stream.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub result: PipelineResult,
    pub run_id: uuid::Uuid,
}

/// Retrieval parameters for the relevant branch
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Corpus relation to search.
    pub corpus: String,
    /// Top-K cut on retrieved documents.
    pub top_k: usize,
    /// Temperature for answer-producing calls.
    pub answer_temperature: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            corpus: "document_chunks".to_string(),
            top_k: 10,
            answer_temperature: 0.7,
        }
    }
}

/// Sequences classification, rewriting, retrieval, assembly, generation,
/// trace recording and streamed delivery for one request.
pub struct Orchestrator {
    completion: Arc<dyn CompletionProvider>,
    classifier: RelevanceClassifier,
    rewriter: QueryRewriter,
    embeddings: EmbeddingClient,
    index: Arc<dyn VectorIndex>,
    generator: AnswerGenerator,
    recorder: TraceRecorder,
    enrichment: Option<EnrichmentClient>,
    options: PipelineOptions,
}

impl Orchestrator {
    /// Wire the orchestrator from application configuration.
    ///
    /// # Errors
    /// - Database connection errors
    /// - HTTP client build errors for the provider clients
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let completion: Arc<dyn CompletionProvider> =
            Arc::new(CompletionClient::from_config(&config.llm)?);
        let embeddings = EmbeddingClient::from_config(&config.embeddings)?;
        let index: Arc<dyn VectorIndex> =
            Arc::new(PgVectorStore::from_config(&config.database).await?);
        let recorder = TraceRecorder::from_config(&config.tracing)?;
        let enrichment = EnrichmentClient::from_config(&config.enrichment);
        let options = PipelineOptions {
            corpus: config.retrieval.corpus.clone(),
            top_k: config.retrieval.top_k,
            answer_temperature: config.llm.answer_temperature,
        };
        Ok(Self::from_parts(
            completion, embeddings, index, recorder, enrichment, options,
        ))
    }

    /// Assemble from already-built collaborators. Tests inject scripted
    /// providers through this constructor.
    #[must_use]
    pub fn from_parts(
        completion: Arc<dyn CompletionProvider>,
        embeddings: EmbeddingClient,
        index: Arc<dyn VectorIndex>,
        recorder: TraceRecorder,
        enrichment: Option<EnrichmentClient>,
        options: PipelineOptions,
    ) -> Self {
        let classifier = RelevanceClassifier::new(completion.clone());
        let rewriter = QueryRewriter::new(completion.clone());
        let generator = AnswerGenerator::new(completion.clone(), options.answer_temperature);
        Self {
            completion,
            classifier,
            rewriter,
            embeddings,
            index,
            generator,
            recorder,
            enrichment,
            options,
        }
    }

    /// Run the full pipeline for one request and hand the finalized
    /// result to the trace recorder.
    ///
    /// # Errors
    /// - `Validation` for a missing or empty query, before any model call
    /// - fatal stage errors from classification, embedding, search or
    ///   generation; no partial result is emitted or traced
    pub async fn execute(&self, messages: &[ChatMessage]) -> Result<PipelineOutcome> {
        let query = validate(messages)?;
        info!("Processing query: {}", query);

        let label = self.classifier.classify(query, messages).await?;

        let result = match label {
            RelevanceLabel::Greeting => {
                let text = self
                    .short_circuit(StagePrompt::Greet { question: query })
                    .await?;
                PipelineResult::new(query, text, ResponseType::Greeting, 0, None)
            }
            RelevanceLabel::Inappropriate => {
                PipelineResult::new(query, GUARDRAIL_REPLY, ResponseType::Inappropriate, 0, None)
            }
            RelevanceLabel::NotRelevant => {
                let text = self
                    .short_circuit(StagePrompt::Deflect { question: query })
                    .await?;
                PipelineResult::new(query, text, ResponseType::NotRelevant, 0, None)
            }
            RelevanceLabel::Relevant => self.answer_relevant(query, messages).await?,
        };

        let run_id = self.recorder.record(&result);
        Ok(PipelineOutcome { result, run_id })
    }

    /// Retrieval branch: rewrite, embed, search, assemble, generate.
    async fn answer_relevant(
        &self,
        query: &str,
        messages: &[ChatMessage],
    ) -> Result<PipelineResult> {
        let rewritten = self.rewriter.rewrite(query, messages).await;

        let embedding = self.embeddings.embed(&rewritten).await?;
        debug!("Generated query embedding ({} dims)", embedding.len());

        let documents = self
            .index
            .search(&embedding, &self.options.corpus, self.options.top_k)
            .await?;
        debug!("Retrieved {} documents", documents.len());

        let context = assemble_context(&documents);

        if let Some(enrichment) = &self.enrichment {
            if !context.is_empty() {
                enrichment.notify(&rewritten, &context);
            }
        }

        // Retrieval used the rewritten query; generation sees the original
        // question plus recent history.
        let answer = self.generator.generate(messages, &context, query).await?;

        Ok(PipelineResult::new(
            query,
            answer,
            ResponseType::Chat,
            documents.len(),
            Some(rewritten),
        ))
    }

    /// Single tailored completion for the greeting and deflection branches.
    async fn short_circuit(&self, prompt: StagePrompt<'_>) -> Result<String> {
        self.completion
            .complete(
                &prompt.system(),
                &[ChatMessage::user(prompt.render())],
                self.options.answer_temperature,
            )
            .await
    }

    /// Streaming delivery pass over a finalized result. Dropping the
    /// returned stream cancels the in-flight provider call.
    pub async fn stream_result(
        &self,
        messages: &[ChatMessage],
        result: &PipelineResult,
    ) -> Result<StreamingAnswer> {
        let stream = self
            .generator
            .stream_finalized(messages, &result.text)
            .await?;
        Ok(StreamingAnswer::new(stream))
    }
}

/// Extract the query: the last user message, which must be non-empty.
/// Runs before classification so malformed requests never spend a model
/// call.
fn validate(messages: &[ChatMessage]) -> Result<&str> {
    if messages.is_empty() {
        return Err(GrainwiseError::Validation(
            "messages array is empty".to_string(),
        ));
    }
    let query = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .ok_or_else(|| GrainwiseError::Validation("no user message in request".to_string()))?;
    if query.content.trim().is_empty() {
        return Err(GrainwiseError::Validation("query is empty".to_string()));
    }
    Ok(&query.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_messages() {
        assert!(matches!(
            validate(&[]),
            Err(GrainwiseError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_blank_query() {
        let messages = vec![ChatMessage::user("   ")];
        assert!(matches!(
            validate(&messages),
            Err(GrainwiseError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_assistant_only_history() {
        let messages = vec![ChatMessage::assistant("hello")];
        assert!(matches!(
            validate(&messages),
            Err(GrainwiseError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_picks_last_user_message() {
        let messages = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("reply"),
            ChatMessage::user("second"),
        ];
        assert_eq!(validate(&messages).unwrap(), "second");
    }
}
