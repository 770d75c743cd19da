//! Threshold statistics service.
//!
//! Maintains rolling per-(anchor, tier) statistics over historical link
//! scores. `refresh()` produces an immutable snapshot on a fixed cadence;
//! the classifier consumes whatever snapshot is current. Refresh is
//! deliberately decoupled from matcher and classifier invocations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use veille_core::{defaults, Result, ScoreStats, StatsStore, Tier};

/// Immutable view of the threshold statistics at one refresh instant.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    cells: HashMap<(Uuid, Tier), ScoreStats>,
    min_samples: i64,
    refreshed_at: DateTime<Utc>,
}

impl StatsSnapshot {
    /// A snapshot with no history. Every lookup falls back.
    pub fn empty(min_samples: i64) -> Self {
        Self::from_cells(HashMap::new(), min_samples)
    }

    /// Build a snapshot directly from cells. Used by `refresh()` and by
    /// tests that need a fixed statistical state.
    pub fn from_cells(cells: HashMap<(Uuid, Tier), ScoreStats>, min_samples: i64) -> Self {
        Self {
            cells,
            min_samples,
            refreshed_at: Utc::now(),
        }
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Raw statistics for a cell, regardless of sample count.
    pub fn stats(&self, anchor_id: Uuid, tier: Tier) -> Option<&ScoreStats> {
        self.cells.get(&(anchor_id, tier))
    }

    /// Statistics for a cell, only if backed by enough samples to trust.
    ///
    /// An under-sampled cell returns `None` and the caller applies the
    /// configured fallback threshold — never an undefined statistic.
    pub fn trusted_stats(&self, anchor_id: Uuid, tier: Tier) -> Option<&ScoreStats> {
        self.stats(anchor_id, tier)
            .filter(|s| s.sample_count >= self.min_samples)
    }
}

/// Computes statistics snapshots from the historical link store.
pub struct ThresholdStatsService {
    store: Arc<dyn StatsStore>,
    window_days: i64,
    min_samples: i64,
}

impl ThresholdStatsService {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self {
            store,
            window_days: defaults::STATS_WINDOW_DAYS,
            min_samples: defaults::STATS_MIN_SAMPLES,
        }
    }

    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    pub fn with_min_samples(mut self, n: i64) -> Self {
        self.min_samples = n;
        self
    }

    /// Recompute all (anchor, tier) cells from the trailing window.
    pub async fn refresh(&self) -> Result<StatsSnapshot> {
        let start = Instant::now();
        let rows = self.store.score_stats(self.window_days).await?;

        let mut cells = HashMap::with_capacity(rows.len());
        for row in rows {
            debug!(
                subsystem = "engine",
                component = "stats",
                anchor_id = %row.anchor_id,
                tier = ?row.tier,
                mean = row.stats.mean,
                stddev = row.stats.stddev,
                sample_count = row.stats.sample_count,
                "Loaded stats cell"
            );
            cells.insert((row.anchor_id, row.tier), row.stats);
        }

        let snapshot = StatsSnapshot::from_cells(cells, self.min_samples);

        info!(
            subsystem = "engine",
            component = "stats",
            op = "refresh",
            cell_count = snapshot.cell_count(),
            window_days = self.window_days,
            duration_ms = start.elapsed().as_millis() as u64,
            "Threshold statistics refreshed"
        );

        Ok(snapshot)
    }
}

/// Mean and population standard deviation of a sample of scores.
///
/// The std of a single sample is 0.0, matching SQL `STDDEV_POP`; an empty
/// sample has no statistics at all.
pub fn score_stats_of(scores: &[f32]) -> Option<ScoreStats> {
    if scores.is_empty() {
        return None;
    }
    let n = scores.len() as f64;
    let mean = scores.iter().map(|s| *s as f64).sum::<f64>() / n;
    let variance = scores
        .iter()
        .map(|s| (*s as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    Some(ScoreStats {
        mean,
        stddev: variance.sqrt(),
        sample_count: scores.len() as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use veille_core::{new_v7, AnchorTierStats};

    struct FixedStatsStore {
        rows: Vec<AnchorTierStats>,
    }

    #[async_trait]
    impl StatsStore for FixedStatsStore {
        async fn score_stats(&self, _window_days: i64) -> Result<Vec<AnchorTierStats>> {
            Ok(self.rows.clone())
        }
    }

    #[test]
    fn test_score_stats_of_basic() {
        let stats = score_stats_of(&[0.2, 0.4]).unwrap();
        assert!((stats.mean - 0.3).abs() < 1e-6);
        assert!((stats.stddev - 0.1).abs() < 1e-6);
        assert_eq!(stats.sample_count, 2);
    }

    #[test]
    fn test_score_stats_of_single_sample() {
        let stats = score_stats_of(&[0.5]).unwrap();
        assert!((stats.mean - 0.5).abs() < 1e-6);
        assert_eq!(stats.stddev, 0.0);
        assert_eq!(stats.sample_count, 1);
    }

    #[test]
    fn test_score_stats_of_empty() {
        assert!(score_stats_of(&[]).is_none());
    }

    #[test]
    fn test_snapshot_trusted_filter() {
        let anchor_id = new_v7();
        let mut cells = HashMap::new();
        cells.insert(
            (anchor_id, Tier::Strict),
            ScoreStats {
                mean: 0.30,
                stddev: 0.10,
                sample_count: 3,
            },
        );
        let snapshot = StatsSnapshot {
            cells,
            min_samples: 10,
            refreshed_at: Utc::now(),
        };

        // Raw stats are visible, trusted stats are not: 3 < 10 samples.
        assert!(snapshot.stats(anchor_id, Tier::Strict).is_some());
        assert!(snapshot.trusted_stats(anchor_id, Tier::Strict).is_none());
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = StatsSnapshot::empty(10);
        assert_eq!(snapshot.cell_count(), 0);
        assert!(snapshot.stats(new_v7(), Tier::Dynamic).is_none());
    }

    #[tokio::test]
    async fn test_refresh_builds_cells() {
        let anchor_id = new_v7();
        let store = FixedStatsStore {
            rows: vec![
                AnchorTierStats {
                    anchor_id,
                    tier: Tier::Dynamic,
                    stats: ScoreStats {
                        mean: 0.28,
                        stddev: 0.05,
                        sample_count: 40,
                    },
                },
                AnchorTierStats {
                    anchor_id,
                    tier: Tier::Strict,
                    stats: ScoreStats {
                        mean: 0.30,
                        stddev: 0.10,
                        sample_count: 25,
                    },
                },
            ],
        };

        let service = ThresholdStatsService::new(Arc::new(store)).with_min_samples(10);
        let snapshot = service.refresh().await.unwrap();

        assert_eq!(snapshot.cell_count(), 2);
        let dynamic = snapshot.trusted_stats(anchor_id, Tier::Dynamic).unwrap();
        assert!((dynamic.mean - 0.28).abs() < 1e-9);
        let strict = snapshot.trusted_stats(anchor_id, Tier::Strict).unwrap();
        assert!((strict.mean + strict.stddev - 0.40).abs() < 1e-9);
    }
}
