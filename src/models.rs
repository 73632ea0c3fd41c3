//! Core data types shared across the pipeline

use serde::Deserialize;
use serde::Serialize;

/// Only the most recent messages are passed to classification, rewriting
/// and generation prompts.
pub const HISTORY_WINDOW: usize = 5;

/// Role of a chat participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in the conversation. Order is chronological and
/// significant; the last user message is "the query".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Clip history to the recency window used by prompt construction.
#[must_use]
pub fn recent_history(messages: &[ChatMessage]) -> &[ChatMessage] {
    let start = messages.len().saturating_sub(HISTORY_WINDOW);
    &messages[start..]
}

/// Inbound request at the API boundary
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// A scored document returned by the vector store, immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub url: String,
    pub chunk_id: i32,
    /// Cosine similarity, descending across a result set.
    pub similarity: f32,
}

/// Handling branch for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevanceLabel {
    Greeting,
    Relevant,
    Inappropriate,
    NotRelevant,
}

impl RelevanceLabel {
    /// Normalize raw classifier output. Anything other than the four
    /// recognized tokens maps to `NotRelevant`, never to `Relevant`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "GREETING" => Self::Greeting,
            "RELEVANT" => Self::Relevant,
            "INAPPROPRIATE" => Self::Inappropriate,
            _ => Self::NotRelevant,
        }
    }
}

/// Response type recorded on the finished result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseType {
    Greeting,
    Inappropriate,
    NotRelevant,
    Chat,
}

impl ResponseType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Inappropriate => "inappropriate",
            Self::NotRelevant => "not-relevant",
            Self::Chat => "chat",
        }
    }
}

/// Per-run metadata handed to the trace recorder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub input: String,
    pub output: String,
    pub context_document_count: usize,
    pub rewritten_query: Option<String>,
    pub response_type: String,
}

/// Finalized outcome of one pipeline run. Produced exactly once per
/// request and immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub text: String,
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub metadata: PipelineMetadata,
}

impl PipelineResult {
    #[must_use]
    pub fn new(
        input: impl Into<String>,
        text: impl Into<String>,
        response_type: ResponseType,
        context_document_count: usize,
        rewritten_query: Option<String>,
    ) -> Self {
        let input = input.into();
        let text = text.into();
        Self {
            metadata: PipelineMetadata {
                input,
                output: text.clone(),
                context_document_count,
                rewritten_query,
                response_type: response_type.as_str().to_string(),
            },
            text,
            response_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parse_recognized_tokens() {
        assert_eq!(RelevanceLabel::parse("GREETING"), RelevanceLabel::Greeting);
        assert_eq!(RelevanceLabel::parse("RELEVANT"), RelevanceLabel::Relevant);
        assert_eq!(
            RelevanceLabel::parse("INAPPROPRIATE"),
            RelevanceLabel::Inappropriate
        );
        assert_eq!(
            RelevanceLabel::parse("NOT_RELEVANT"),
            RelevanceLabel::NotRelevant
        );
    }

    #[test]
    fn test_label_parse_is_case_and_whitespace_insensitive() {
        assert_eq!(RelevanceLabel::parse(" relevant \n"), RelevanceLabel::Relevant);
        assert_eq!(RelevanceLabel::parse("greeting"), RelevanceLabel::Greeting);
    }

    #[test]
    fn test_label_parse_defaults_to_not_relevant() {
        assert_eq!(RelevanceLabel::parse("maybe"), RelevanceLabel::NotRelevant);
        assert_eq!(RelevanceLabel::parse(""), RelevanceLabel::NotRelevant);
        assert_eq!(RelevanceLabel::parse("RELEVANT?"), RelevanceLabel::NotRelevant);
    }

    #[test]
    fn test_label_parse_is_idempotent_on_normalized_input() {
        for raw in ["GREETING", "RELEVANT", "INAPPROPRIATE", "banana"] {
            let once = RelevanceLabel::parse(raw);
            let twice = RelevanceLabel::parse(&raw.trim().to_uppercase());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_recent_history_clips_to_window() {
        let messages: Vec<ChatMessage> =
            (0..8).map(|i| ChatMessage::user(format!("m{i}"))).collect();
        let recent = recent_history(&messages);
        assert_eq!(recent.len(), HISTORY_WINDOW);
        assert_eq!(recent[0].content, "m3");
        assert_eq!(recent[4].content, "m7");
    }

    #[test]
    fn test_recent_history_short_input() {
        let messages = vec![ChatMessage::user("hi")];
        assert_eq!(recent_history(&messages).len(), 1);
    }

    #[test]
    fn test_pipeline_result_metadata_mirrors_output() {
        let result = PipelineResult::new(
            "what glue?",
            "Use PVA.",
            ResponseType::Chat,
            3,
            Some("best glue for end grain".to_string()),
        );
        assert_eq!(result.metadata.output, result.text);
        assert_eq!(result.metadata.response_type, "chat");
        assert_eq!(result.metadata.context_document_count, 3);
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&Role::User).unwrap();
        assert_eq!(json, "\"user\"");
        let role: Role = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(role, Role::Assistant);
    }
}
