//! Link repository implementation.
//!
//! The unique key on (document_id, anchor_id) plus `ON CONFLICT` upserts
//! makes duplicate links structurally impossible. Batch commits run inside
//! a single transaction: link writes and document marker advances land
//! together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use veille_core::{
    new_v7, Error, HighlightedLink, Link, LinkFlag, LinkStore, Result, ScoredLink, SourceCategory,
    UnresolvedLink,
};

/// PostgreSQL implementation of LinkStore.
pub struct PgLinkRepository {
    pool: Pool<Postgres>,
}

impl PgLinkRepository {
    /// Create a new PgLinkRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_link(row: &sqlx::postgres::PgRow) -> Link {
        Link {
            id: row.get("id"),
            document_id: row.get("document_id"),
            anchor_id: row.get("anchor_id"),
            score: row.get("score"),
            anchor_highlight: row.get("anchor_highlight"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl LinkStore for PgLinkRepository {
    async fn commit_match_batch(
        &self,
        links: &[ScoredLink],
        matched_document_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut written = 0u64;

        for link in links {
            // Re-scoring an existing pair updates the score and re-admits
            // nothing: the highlight flag is preserved.
            let result = sqlx::query(
                "INSERT INTO document_anchor_link
                     (id, document_id, anchor_id, score, anchor_highlight, created_at)
                 VALUES ($1, $2, $3, $4, NULL, $5)
                 ON CONFLICT (document_id, anchor_id)
                 DO UPDATE SET score = EXCLUDED.score",
            )
            .bind(new_v7())
            .bind(link.document_id)
            .bind(link.anchor_id)
            .bind(link.score)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            written += result.rows_affected();
        }

        // Idempotent advance: only null markers are filled.
        sqlx::query(
            "UPDATE document SET matched_at = $2
             WHERE id = ANY($1) AND matched_at IS NULL",
        )
        .bind(matched_document_ids)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(written)
    }

    async fn unresolved(&self, limit: i64) -> Result<Vec<UnresolvedLink>> {
        let rows = sqlx::query(
            "SELECT l.id, l.document_id, l.anchor_id, l.score, d.category
             FROM document_anchor_link l
             JOIN document d ON d.id = l.document_id
             JOIN anchor a ON a.id = l.anchor_id AND a.is_active
             WHERE l.anchor_highlight IS NULL
             ORDER BY l.created_at
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| {
                let category: String = row.get("category");
                let category: SourceCategory =
                    category.parse().map_err(|e: String| Error::InvalidInput(e))?;
                Ok(UnresolvedLink {
                    link_id: row.get("id"),
                    document_id: row.get("document_id"),
                    anchor_id: row.get("anchor_id"),
                    score: row.get("score"),
                    category,
                })
            })
            .collect()
    }

    async fn commit_enrichment_batch(
        &self,
        flags: &[LinkFlag],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        for flag in flags {
            sqlx::query("UPDATE document_anchor_link SET anchor_highlight = $2 WHERE id = $1")
                .bind(flag.link_id)
                .bind(flag.anchor_highlight)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        // Document-level aggregate, recomputed from the full link set of
        // every touched document; `enriched_at` tracks the latest batch.
        let mut touched: Vec<Uuid> = flags.iter().map(|f| f.document_id).collect();
        touched.sort_unstable();
        touched.dedup();

        sqlx::query(
            "UPDATE document d
             SET org_highlight = EXISTS (
                     SELECT 1 FROM document_anchor_link l
                     WHERE l.document_id = d.id AND l.anchor_highlight IS TRUE
                 ),
                 enriched_at = $2
             WHERE d.id = ANY($1)",
        )
        .bind(&touched)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(flags.len() as u64)
    }

    async fn links_for_document(&self, document_id: Uuid) -> Result<Vec<Link>> {
        let rows = sqlx::query(
            "SELECT id, document_id, anchor_id, score, anchor_highlight, created_at
             FROM document_anchor_link
             WHERE document_id = $1
             ORDER BY score DESC, created_at DESC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::parse_link).collect())
    }

    async fn highlights_in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HighlightedLink>> {
        let rows = sqlx::query(
            "SELECT l.id AS link_id, l.score, l.anchor_highlight, l.created_at,
                    d.id AS document_id, d.title, d.url, d.category, d.published_at,
                    COALESCE(d.org_highlight, FALSE) AS org_highlight,
                    a.id AS anchor_id, a.name AS anchor_name
             FROM document_anchor_link l
             JOIN document d ON d.id = l.document_id
             JOIN anchor a ON a.id = l.anchor_id
             WHERE l.anchor_highlight IS NOT NULL
               AND l.created_at >= $1 AND l.created_at < $2
             ORDER BY l.score DESC, l.created_at DESC",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| {
                let category: String = row.get("category");
                let category: SourceCategory =
                    category.parse().map_err(|e: String| Error::InvalidInput(e))?;
                Ok(HighlightedLink {
                    link_id: row.get("link_id"),
                    document_id: row.get("document_id"),
                    document_title: row.get("title"),
                    document_url: row.get("url"),
                    category,
                    anchor_id: row.get("anchor_id"),
                    anchor_name: row.get("anchor_name"),
                    score: row.get("score"),
                    anchor_highlight: row.get("anchor_highlight"),
                    org_highlight: row.get("org_highlight"),
                    published_at: row.get("published_at"),
                })
            })
            .collect()
    }

    async fn reset_anchor_flags(&self, anchor_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE document_anchor_link SET anchor_highlight = NULL
             WHERE anchor_id = $1 AND anchor_highlight IS NOT NULL",
        )
        .bind(anchor_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "links",
            op = "reset_anchor_flags",
            anchor_id = %anchor_id,
            link_count = result.rows_affected(),
            "Anchor links re-admitted to the classifier frontier"
        );

        Ok(result.rows_affected())
    }
}

impl PgLinkRepository {
    /// Count links awaiting classification. Used by health/ops tooling.
    pub async fn unresolved_depth(&self) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM document_anchor_link
             WHERE anchor_highlight IS NULL",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.get("count"))
    }
}
