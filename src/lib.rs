pub mod api;
pub mod config;
pub mod embeddings;
pub mod enrichment;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod rag;
pub mod retry;
pub mod store;
pub mod trace;

pub use config::AppConfig;
pub use errors::*;
