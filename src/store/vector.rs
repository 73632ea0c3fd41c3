//! Nearest-neighbor search against a pgvector-backed corpus

use std::time::Duration;

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use sqlx::Row;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::errors::GrainwiseError;
use crate::models::RetrievedDocument;
use crate::Result;

/// Nearest-neighbor document lookup.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `top_k` documents from `corpus`, ordered by ascending
    /// cosine distance (descending similarity). Rows with a null embedding
    /// are excluded; an empty corpus yields an empty list, not an error.
    async fn search(
        &self,
        embedding: &[f32],
        corpus: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>>;
}

/// Vector store backed by PostgreSQL with the pgvector extension
pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    /// Connect with a bounded pool. The acquire timeout caps worst-case
    /// latency when the pool is saturated.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// The corpus name is interpolated into the query text, so it must be a
/// plain identifier.
fn validate_corpus_identifier(corpus: &str) -> Result<()> {
    let valid = !corpus.is_empty()
        && corpus
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !corpus.chars().next().is_some_and(|c| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(GrainwiseError::Configuration(format!(
            "invalid corpus identifier: {corpus:?}"
        )))
    }
}

#[async_trait]
impl VectorIndex for PgVectorStore {
    async fn search(
        &self,
        embedding: &[f32],
        corpus: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        validate_corpus_identifier(corpus)?;
        debug!("Vector search in {} (top_k={})", corpus, top_k);

        let query = format!(
            "SELECT id, title, content, url, chunk_id, \
                    1 - (embedding <=> $1::vector) AS similarity \
             FROM {corpus} \
             WHERE embedding IS NOT NULL \
             ORDER BY embedding <=> $1::vector \
             LIMIT $2"
        );

        let rows = sqlx::query(&query)
            .bind(Vector::from(embedding.to_vec()))
            .bind(i64::try_from(top_k).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let documents = rows
            .into_iter()
            .map(|row| {
                Ok(RetrievedDocument {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    text: row.try_get("content")?,
                    url: row.try_get("url")?,
                    chunk_id: row.try_get("chunk_id")?,
                    similarity: row.try_get::<f64, _>("similarity")? as f32,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_identifier_accepts_plain_names() {
        assert!(validate_corpus_identifier("document_chunks").is_ok());
        assert!(validate_corpus_identifier("corpus2").is_ok());
    }

    #[test]
    fn test_corpus_identifier_rejects_injection_attempts() {
        assert!(validate_corpus_identifier("docs; DROP TABLE docs").is_err());
        assert!(validate_corpus_identifier("docs--").is_err());
        assert!(validate_corpus_identifier("").is_err());
        assert!(validate_corpus_identifier("1docs").is_err());
    }

    #[tokio::test]
    #[ignore = "Requires a PostgreSQL database with pgvector"]
    async fn test_search_orders_by_non_increasing_similarity() {
        let config = crate::config::DatabaseConfig {
            url: std::env::var("DATABASE_URL").unwrap(),
            max_connections: 2,
            min_connections: 1,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 60,
        };
        let store = PgVectorStore::from_config(&config).await.unwrap();
        let embedding = vec![0.1; 1536];

        let first = store.search(&embedding, "document_chunks", 10).await.unwrap();
        assert!(first.len() <= 10);
        for pair in first.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }

        // Same embedding, same ordered set
        let second = store.search(&embedding, "document_chunks", 10).await.unwrap();
        assert_eq!(first, second);
    }
}
