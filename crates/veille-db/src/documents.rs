//! Document repository implementation.
//!
//! Frontier queries select by null-marker predicates and timestamp
//! advances only ever fill null columns, so re-running a stage against an
//! unfinished frontier is naturally idempotent. Markers are cleared only
//! by the explicit administrative resets at the bottom of this file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use veille_core::{Document, DocumentStore, Error, PipelineStage, Result, SourceCategory};

/// PostgreSQL implementation of DocumentStore.
pub struct PgDocumentRepository {
    pool: Pool<Postgres>,
}

impl PgDocumentRepository {
    /// Create a new PgDocumentRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Result<Document> {
        let category: String = row.get("category");
        let category: SourceCategory = category
            .parse()
            .map_err(|e: String| Error::InvalidInput(e))?;
        Ok(Document {
            id: row.get("id"),
            source_id: row.get("source_id"),
            title: row.get("title"),
            url: row.get("url"),
            category,
            published_at: row.get("published_at"),
            org_highlight: row.get("org_highlight"),
            ingested_at: row.get("ingested_at"),
            indexed_at: row.get("indexed_at"),
            matched_at: row.get("matched_at"),
            enriched_at: row.get("enriched_at"),
        })
    }
}

const DOCUMENT_COLUMNS: &str = "id, source_id, title, url, category, published_at, \
     org_highlight, ingested_at, indexed_at, matched_at, enriched_at";

#[async_trait]
impl DocumentStore for PgDocumentRepository {
    async fn get(&self, id: Uuid) -> Result<Document> {
        let row = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM document WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::DocumentNotFound(id))?;

        Self::parse_row(&row)
    }

    async fn match_frontier(&self, limit: i64) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS}
             FROM document
             WHERE indexed_at IS NOT NULL AND matched_at IS NULL
             ORDER BY ingested_at
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(Self::parse_row).collect()
    }

    async fn settle_linkless(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE document d
             SET enriched_at = $1,
                 org_highlight = EXISTS (
                     SELECT 1 FROM document_anchor_link l
                     WHERE l.document_id = d.id AND l.anchor_highlight IS TRUE
                 )
             WHERE d.matched_at IS NOT NULL
               AND d.enriched_at IS NULL
               AND NOT EXISTS (
                   SELECT 1 FROM document_anchor_link l
                   WHERE l.document_id = d.id AND l.anchor_highlight IS NULL
               )",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }

    async fn reset_stage(&self, document_id: Uuid, stage: PipelineStage) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        match stage {
            PipelineStage::Enriched => {
                // Re-admit the document's links to the classifier frontier;
                // matching state is untouched.
                sqlx::query(
                    "UPDATE document_anchor_link SET anchor_highlight = NULL
                     WHERE document_id = $1",
                )
                .bind(document_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;

                sqlx::query(
                    "UPDATE document SET enriched_at = NULL, org_highlight = NULL
                     WHERE id = $1",
                )
                .bind(document_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            }
            PipelineStage::Matched | PipelineStage::Indexed | PipelineStage::Ingested => {
                // Re-matching recomputes links from scratch; the unique key
                // makes this the only sanctioned way links are deleted.
                sqlx::query("DELETE FROM document_anchor_link WHERE document_id = $1")
                    .bind(document_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(Error::Database)?;

                let clear_indexed = stage != PipelineStage::Matched;
                sqlx::query(
                    "UPDATE document
                     SET matched_at = NULL, enriched_at = NULL, org_highlight = NULL,
                         indexed_at = CASE WHEN $2 THEN NULL ELSE indexed_at END
                     WHERE id = $1",
                )
                .bind(document_id)
                .bind(clear_indexed)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            }
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "documents",
            op = "reset_stage",
            document_id = %document_id,
            stage = ?stage,
            "Document pipeline markers reset"
        );

        Ok(())
    }
}

impl PgDocumentRepository {
    /// Count documents awaiting matching. Used by health/ops tooling.
    pub async fn match_frontier_depth(&self) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM document
             WHERE indexed_at IS NOT NULL AND matched_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.get("count"))
    }
}
