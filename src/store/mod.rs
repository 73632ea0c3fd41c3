//! Vector store access

pub mod vector;

pub use vector::PgVectorStore;
pub use vector::VectorIndex;
