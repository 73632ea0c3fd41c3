//! Embedding generation for retrieval queries

pub mod client;

pub use client::EmbeddingBackend;
pub use client::EmbeddingClient;
pub use client::HttpEmbeddingBackend;
