//! pgvector-backed embedding resolver.
//!
//! A pure lookup layer over the `embedding` table: document chunks are
//! keyed by document id, anchor component vectors by (kind, ref). One
//! dispatching implementation covers every component kind; adding a kind
//! is a new `kind` value, not a new code path.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use veille_core::{ComponentKind, EmbeddingResolver, Error, Result};

/// PostgreSQL implementation of EmbeddingResolver.
pub struct PgEmbeddingResolver {
    pool: Pool<Postgres>,
}

impl PgEmbeddingResolver {
    /// Create a new PgEmbeddingResolver with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmbeddingResolver for PgEmbeddingResolver {
    async fn resolve_component(
        &self,
        kind: ComponentKind,
        component_ref: &str,
    ) -> Result<Vec<Vector>> {
        let rows = sqlx::query(
            "SELECT vector FROM embedding
             WHERE component_kind = $1 AND component_ref = $2
             ORDER BY chunk_index",
        )
        .bind(kind.to_string())
        .bind(component_ref)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        if rows.is_empty() {
            return Err(Error::Embedding(format!(
                "no vectors for component {kind}:{component_ref}"
            )));
        }

        Ok(rows.into_iter().map(|row| row.get("vector")).collect())
    }

    async fn document_vectors(&self, document_id: Uuid) -> Result<Vec<Vector>> {
        let rows = sqlx::query(
            "SELECT vector FROM embedding
             WHERE document_id = $1
             ORDER BY chunk_index",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|row| row.get("vector")).collect())
    }
}
