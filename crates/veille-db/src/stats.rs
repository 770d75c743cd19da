//! Historical score aggregation for the threshold statistics service.
//!
//! Aggregates are grouped per (anchor, source category) in SQL, then folded
//! into (anchor, tier) cells in Rust so the category → tier map lives in
//! exactly one place (`SourceCategory::tier`). Folding sums and sums of
//! squares keeps the combined mean/stddev exact.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::warn;
use uuid::Uuid;

use veille_core::{AnchorTierStats, Error, Result, ScoreStats, SourceCategory, StatsStore, Tier};

/// PostgreSQL implementation of StatsStore.
pub struct PgStatsRepository {
    pool: Pool<Postgres>,
}

impl PgStatsRepository {
    /// Create a new PgStatsRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsStore for PgStatsRepository {
    async fn score_stats(&self, window_days: i64) -> Result<Vec<AnchorTierStats>> {
        let cutoff = Utc::now() - Duration::days(window_days);

        let rows = sqlx::query(
            "SELECT l.anchor_id, d.category,
                    COUNT(*) AS n,
                    SUM(l.score)::FLOAT8 AS sum,
                    SUM(l.score * l.score)::FLOAT8 AS sumsq
             FROM document_anchor_link l
             JOIN document d ON d.id = l.document_id
             JOIN anchor a ON a.id = l.anchor_id AND a.is_active
             WHERE l.created_at >= $1
             GROUP BY l.anchor_id, d.category",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        // Fold per-category moments into per-tier cells.
        let mut cells: HashMap<(Uuid, Tier), (i64, f64, f64)> = HashMap::new();
        for row in rows {
            let category: String = row.get("category");
            let category: SourceCategory = match category.parse() {
                Ok(c) => c,
                Err(e) => {
                    warn!(
                        subsystem = "db",
                        component = "stats",
                        error = %e,
                        "Skipping stats rows for unknown category"
                    );
                    continue;
                }
            };
            let anchor_id: Uuid = row.get("anchor_id");
            let n: i64 = row.get("n");
            let sum: f64 = row.get("sum");
            let sumsq: f64 = row.get("sumsq");

            let cell = cells
                .entry((anchor_id, category.tier()))
                .or_insert((0, 0.0, 0.0));
            cell.0 += n;
            cell.1 += sum;
            cell.2 += sumsq;
        }

        Ok(cells
            .into_iter()
            .filter(|((_, _), (n, _, _))| *n > 0)
            .map(|((anchor_id, tier), (n, sum, sumsq))| {
                let mean = sum / n as f64;
                // Population variance; guard tiny negative values from
                // floating-point cancellation.
                let variance = (sumsq / n as f64 - mean * mean).max(0.0);
                AnchorTierStats {
                    anchor_id,
                    tier,
                    stats: ScoreStats {
                        mean,
                        stddev: variance.sqrt(),
                        sample_count: n,
                    },
                }
            })
            .collect())
    }
}
