//! Query orchestration pipeline
//!
//! Chains relevance classification, query rewriting, embedding generation,
//! nearest-neighbor retrieval, context assembly and grounded answer
//! generation, with short-circuit branches for greetings, off-topic and
//! inappropriate input.
//!
//! # Examples
//!
//! ```rust,no_run
//! use grainwise::config::AppConfig;
//! use grainwise::models::ChatMessage;
//! use grainwise::rag::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let orchestrator = Orchestrator::new(&config).await?;
//!
//!     let messages = vec![ChatMessage::user("What glue works for end grain?")];
//!     let outcome = orchestrator.execute(&messages).await?;
//!     println!("{}", outcome.result.text);
//!
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod context;
pub mod generator;
pub mod pipeline;
pub mod rewriter;

pub use classifier::RelevanceClassifier;
pub use context::assemble_context;
pub use generator::AnswerGenerator;
pub use pipeline::Orchestrator;
pub use pipeline::PipelineOptions;
pub use pipeline::PipelineOutcome;
pub use pipeline::GUARDRAIL_REPLY;
pub use rewriter::QueryRewriter;
