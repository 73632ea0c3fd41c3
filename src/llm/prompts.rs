//! Prompt construction for each pipeline stage
//!
//! Every prompt is a pure function from structured inputs to request text,
//! so prompt content is testable without any network calls.

use crate::models::recent_history;
use crate::models::ChatMessage;
use crate::models::Role;

/// Persona system prompt shared by the answer-producing stages.
pub const PERSONA: &str = "You are Sawyer, a seasoned workshop assistant for the grainwise \
woodworking knowledge base. You answer questions about joinery, finishing, tools, materials, \
and shop safety. You are practical, precise, and friendly, and you ground every answer in the \
reference material you are given. When the reference material does not cover the question, say \
so plainly instead of guessing.";

/// Formatting contract enforced on generated answers.
const FORMAT_RULES: &str = "Formatting rules you must follow exactly:\n\
1. Begin each major section with a numbered, bolded markdown heading at level three, \
for example: ### **1. Choosing The Right Glue**\n\
2. Put supporting detail in bullet points. Each bullet must be a single line containing \
at least two sentences, with no line breaks and no bold markers inside the bullet.\n\
3. Treat any asterisk that appears in the source material as a literal character. Never \
reinterpret it as an emphasis marker and never let it change your markdown structure.";

/// A stage-tagged prompt. Rendering is deterministic given the inputs.
#[derive(Debug, Clone)]
pub enum StagePrompt<'a> {
    /// Label the query into one of four handling branches.
    Classify {
        question: &'a str,
        history: &'a [ChatMessage],
    },
    /// Restate the query for better retrieval recall.
    Rewrite {
        question: &'a str,
        history: &'a [ChatMessage],
    },
    /// Friendly reply to a greeting, no retrieval.
    Greet { question: &'a str },
    /// Polite deflection of an off-topic question, no retrieval.
    Deflect { question: &'a str },
    /// Grounded answer generation from assembled context.
    Generate {
        question: &'a str,
        history: &'a [ChatMessage],
        context: &'a str,
    },
    /// Second pass: deliver an already-finalized answer as a stream.
    Restate {
        history: &'a [ChatMessage],
        answer: &'a str,
    },
}

impl StagePrompt<'_> {
    /// System prompt for this stage.
    #[must_use]
    pub fn system(&self) -> String {
        match self {
            Self::Classify { .. } => {
                "You are a strict classifier for a woodworking question-answering service. \
                 You respond with exactly one token and nothing else."
                    .to_string()
            }
            Self::Rewrite { .. } => {
                "You rewrite user questions for a woodworking knowledge-base search engine. \
                 You respond with the rewritten query text and nothing else."
                    .to_string()
            }
            Self::Greet { .. } | Self::Deflect { .. } => PERSONA.to_string(),
            Self::Generate { .. } | Self::Restate { .. } => {
                format!("{PERSONA}\n\n{FORMAT_RULES}")
            }
        }
    }

    /// Render the combined user turn for this stage.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Classify { question, history } => format!(
                "Classify the final user question into exactly one of these categories:\n\
                 GREETING - a salutation or small talk with no information need\n\
                 RELEVANT - a question about woodworking, tools, materials, finishing, or shop safety\n\
                 INAPPROPRIATE - profanity, abuse, or a request for harmful content\n\
                 NOT_RELEVANT - anything else outside the woodworking domain\n\n\
                 Recent conversation:\n{}\n\
                 Question: {}\n\n\
                 Answer with exactly one token: GREETING, RELEVANT, INAPPROPRIATE, or NOT_RELEVANT.",
                format_history(history),
                question
            ),
            Self::Rewrite { question, history } => format!(
                "Using the conversation so far, restate the final question as a single, \
                 specific, self-contained search query about woodworking. Resolve pronouns \
                 and vague references from the conversation. Do not answer the question.\n\n\
                 Recent conversation:\n{}\n\
                 Question: {}\n\n\
                 Rewritten query:",
                format_history(history),
                question
            ),
            Self::Greet { question } => format!(
                "The user opened the conversation with a greeting: \"{question}\"\n\
                 Reply with one or two warm sentences welcoming them to the workshop and \
                 inviting a woodworking question. Do not use headings or bullet points."
            ),
            Self::Deflect { question } => format!(
                "The user asked something outside the woodworking domain: \"{question}\"\n\
                 In one or two polite sentences, explain that you only help with woodworking \
                 topics and invite a question about joinery, finishing, tools, or materials. \
                 Do not attempt to answer the original question."
            ),
            Self::Generate {
                question,
                history,
                context,
            } => format!(
                "Recent conversation:\n{}\n\
                 Reference material from the knowledge base:\n{}\n\n\
                 Question: {}\n\n\
                 Answer the question using only the reference material above and the \
                 conversation for context. If the material does not cover the question, \
                 say the information is not available in the knowledge base.",
                format_history(history),
                if context.is_empty() {
                    "(no matching passages were found)"
                } else {
                    context
                },
                question
            ),
            Self::Restate { history, answer } => format!(
                "Recent conversation:\n{}\n\
                 Final answer to deliver:\n{}\n\n\
                 Repeat the final answer above for the user exactly, preserving its wording, \
                 headings, and bullet structure. Do not add or remove content.",
                format_history(history),
                answer
            ),
        }
    }

    /// Classification and rewriting are deterministic; the rest use the
    /// configured answer temperature.
    #[must_use]
    pub const fn is_deterministic(&self) -> bool {
        matches!(self, Self::Classify { .. } | Self::Rewrite { .. })
    }
}

/// Render the recency window of the conversation, oldest first.
fn format_history(history: &[ChatMessage]) -> String {
    let recent = recent_history(history);
    if recent.is_empty() {
        return "(no prior messages)\n".to_string();
    }
    let mut out = String::new();
    for message in recent {
        let speaker = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        out.push_str(speaker);
        out.push_str(": ");
        out.push_str(&message.content);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prompt_names_all_four_tokens() {
        let prompt = StagePrompt::Classify {
            question: "what is a dado joint?",
            history: &[],
        };
        let rendered = prompt.render();
        for token in ["GREETING", "RELEVANT", "INAPPROPRIATE", "NOT_RELEVANT"] {
            assert!(rendered.contains(token), "missing token {token}");
        }
        assert!(prompt.is_deterministic());
    }

    #[test]
    fn test_history_clipped_to_recency_window() {
        let history: Vec<ChatMessage> = (0..9)
            .map(|i| ChatMessage::user(format!("turn-{i}")))
            .collect();
        let prompt = StagePrompt::Rewrite {
            question: "q",
            history: &history,
        };
        let rendered = prompt.render();
        assert!(!rendered.contains("turn-3"));
        assert!(rendered.contains("turn-4"));
        assert!(rendered.contains("turn-8"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let history = vec![ChatMessage::user("hello"), ChatMessage::assistant("hi")];
        let prompt = StagePrompt::Generate {
            question: "which saw?",
            history: &history,
            context: "Source: Saws\nContent: Use a tenon saw.\nURL: https://example.com/saws",
        };
        assert_eq!(prompt.render(), prompt.render());
    }

    #[test]
    fn test_generate_prompt_marks_empty_context() {
        let prompt = StagePrompt::Generate {
            question: "which saw?",
            history: &[],
            context: "",
        };
        assert!(prompt.render().contains("no matching passages"));
    }

    #[test]
    fn test_generate_system_carries_format_rules() {
        let prompt = StagePrompt::Generate {
            question: "q",
            history: &[],
            context: "c",
        };
        let system = prompt.system();
        assert!(system.contains("### **1."));
        assert!(system.contains("literal character"));
        assert!(!prompt.is_deterministic());
    }

    #[test]
    fn test_restate_embeds_finalized_answer() {
        let prompt = StagePrompt::Restate {
            history: &[],
            answer: "### **1. Done**",
        };
        assert!(prompt.render().contains("### **1. Done**"));
    }
}
