//! Anchor repository implementation.
//!
//! The engine reads anchors; creation and editing belong to admin tooling.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use veille_core::{Anchor, AnchorComponent, AnchorStore, ComponentKind, Error, Result};

/// PostgreSQL implementation of AnchorStore.
pub struct PgAnchorRepository {
    pool: Pool<Postgres>,
}

impl PgAnchorRepository {
    /// Create a new PgAnchorRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnchorStore for PgAnchorRepository {
    async fn active_anchors(&self) -> Result<Vec<Anchor>> {
        let rows = sqlx::query(
            "SELECT id, name, description, author, is_active, created_at
             FROM anchor
             WHERE is_active
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| Anchor {
                id: row.get("id"),
                name: row.get("name"),
                description: row.get("description"),
                author: row.get("author"),
                is_active: row.get("is_active"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn components_for(&self, anchor_ids: &[Uuid]) -> Result<Vec<AnchorComponent>> {
        let rows = sqlx::query(
            "SELECT anchor_id, kind, component_ref
             FROM anchor_component
             WHERE anchor_id = ANY($1)
             ORDER BY anchor_id, id",
        )
        .bind(anchor_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| {
                let kind: String = row.get("kind");
                let kind: ComponentKind =
                    kind.parse().map_err(|e: String| Error::InvalidInput(e))?;
                Ok(AnchorComponent {
                    anchor_id: row.get("anchor_id"),
                    kind,
                    component_ref: row.get("component_ref"),
                })
            })
            .collect()
    }
}
