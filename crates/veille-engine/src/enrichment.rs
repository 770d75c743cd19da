//! Tiered enrichment classifier.
//!
//! Consumes the unresolved-link frontier (links whose `anchor_highlight`
//! is still null — deliberately not "unenriched documents", so links
//! created for an already-enriched document still get classified), applies
//! the tier threshold policy, and writes highlight flags. Document-level
//! `org_highlight` and `enriched_at` are maintained by the store as part
//! of each batch commit.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, trace};
use uuid::Uuid;

use veille_core::{defaults, DocumentStore, LinkFlag, LinkStore, Result, Tier, UnresolvedLink};

use crate::stats::StatsSnapshot;

/// Classifier tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentConfig {
    /// Unresolved links per batch.
    pub batch_size: i64,
    /// Tier 1 fixed threshold.
    pub tier1_threshold: f32,
    /// Threshold applied when a statistics cell is missing or under-sampled.
    pub fallback_threshold: f64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::ENRICH_BATCH_SIZE,
            tier1_threshold: defaults::TIER1_THRESHOLD,
            fallback_threshold: defaults::STATS_FALLBACK_THRESHOLD,
        }
    }
}

/// Outcome of one classifier invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichReport {
    pub batches: u64,
    pub links_classified: u64,
    pub links_highlighted: u64,
    pub documents_settled: u64,
}

/// Select the effective threshold for one link.
///
/// Tier 1 uses the fixed constant. Tiers 2 and 3 consult the statistics
/// snapshot for the link's (anchor, tier) cell; a missing or under-sampled
/// cell falls back to the configured default rather than an undefined
/// statistic.
pub fn effective_threshold(
    snapshot: &StatsSnapshot,
    anchor_id: Uuid,
    tier: Tier,
    config: &EnrichmentConfig,
) -> f64 {
    match tier {
        Tier::Fixed => config.tier1_threshold as f64,
        Tier::Dynamic => snapshot
            .trusted_stats(anchor_id, tier)
            .map(|s| s.mean)
            .unwrap_or(config.fallback_threshold),
        Tier::Strict => snapshot
            .trusted_stats(anchor_id, tier)
            .map(|s| s.mean + s.stddev)
            .unwrap_or(config.fallback_threshold),
    }
}

/// Highlight decision: inclusive comparison, a score exactly at the
/// threshold counts.
///
/// Compared in f32, the precision scores are stored at: a score of 0.35
/// must meet a configured threshold of 0.35 even though `0.35f32 as f64`
/// falls a hair below the f64 literal.
pub fn is_highlight(score: f32, threshold: f64) -> bool {
    score >= threshold as f32
}

pub struct EnrichmentClassifier {
    links: Arc<dyn LinkStore>,
    documents: Arc<dyn DocumentStore>,
    config: EnrichmentConfig,
}

impl EnrichmentClassifier {
    pub fn new(
        links: Arc<dyn LinkStore>,
        documents: Arc<dyn DocumentStore>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            links,
            documents,
            config,
        }
    }

    /// Drain the unresolved-link frontier against one statistics snapshot,
    /// then settle documents left with no pending links (including those
    /// whose every candidate was pre-filtered out — no match is a valid
    /// terminal state, not an error).
    pub async fn run(&self, snapshot: &StatsSnapshot) -> Result<EnrichReport> {
        let start = Instant::now();
        let mut report = EnrichReport::default();

        loop {
            let frontier = self.links.unresolved(self.config.batch_size).await?;
            if frontier.is_empty() {
                break;
            }

            let flags = self.classify_batch(&frontier, snapshot);
            let highlighted = flags.iter().filter(|f| f.anchor_highlight).count() as u64;

            self.links
                .commit_enrichment_batch(&flags, Utc::now())
                .await?;

            report.batches += 1;
            report.links_classified += flags.len() as u64;
            report.links_highlighted += highlighted;

            debug!(
                subsystem = "engine",
                component = "enrichment",
                op = "classify_batch",
                link_count = flags.len(),
                highlighted,
                "Enrichment batch committed"
            );
        }

        report.documents_settled = self.documents.settle_linkless(Utc::now()).await?;

        info!(
            subsystem = "engine",
            component = "enrichment",
            op = "run",
            batches = report.batches,
            links_classified = report.links_classified,
            links_highlighted = report.links_highlighted,
            documents_settled = report.documents_settled,
            duration_ms = start.elapsed().as_millis() as u64,
            "Enrichment run complete"
        );

        Ok(report)
    }

    /// Pure classification of one batch. No side effects before commit.
    fn classify_batch(&self, frontier: &[UnresolvedLink], snapshot: &StatsSnapshot) -> Vec<LinkFlag> {
        frontier
            .iter()
            .map(|link| {
                let tier = link.category.tier();
                let threshold = effective_threshold(snapshot, link.anchor_id, tier, &self.config);
                let highlight = is_highlight(link.score, threshold);

                trace!(
                    subsystem = "engine",
                    component = "enrichment",
                    link_id = %link.link_id,
                    document_id = %link.document_id,
                    anchor_id = %link.anchor_id,
                    category = %link.category,
                    tier = ?tier,
                    score = link.score,
                    threshold,
                    highlight,
                    "Classified link"
                );

                LinkFlag {
                    link_id: link.link_id,
                    document_id: link.document_id,
                    anchor_highlight: highlight,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{score_stats_of, StatsSnapshot};
    use std::collections::HashMap;
    use veille_core::{new_v7, ScoreStats};

    fn snapshot_with(
        anchor_id: Uuid,
        tier: Tier,
        stats: ScoreStats,
        min_samples: i64,
    ) -> StatsSnapshot {
        let mut cells = HashMap::new();
        cells.insert((anchor_id, tier), stats);
        StatsSnapshot::from_cells(cells, min_samples)
    }

    #[test]
    fn test_tier1_fixed_threshold() {
        let config = EnrichmentConfig::default();
        let snapshot = StatsSnapshot::empty(10);
        let t = effective_threshold(&snapshot, new_v7(), Tier::Fixed, &config);
        assert!((t - 0.20).abs() < 1e-6);
    }

    #[test]
    fn test_tier2_uses_mean() {
        let config = EnrichmentConfig::default();
        let anchor_id = new_v7();
        let stats = ScoreStats {
            mean: 0.28,
            stddev: 0.05,
            sample_count: 50,
        };
        let snapshot = snapshot_with(anchor_id, Tier::Dynamic, stats, 10);
        let t = effective_threshold(&snapshot, anchor_id, Tier::Dynamic, &config);
        assert!((t - 0.28).abs() < 1e-9);
    }

    #[test]
    fn test_tier3_uses_mean_plus_stddev() {
        // Spec worked example: mean 0.30, stddev 0.10 → effective 0.40.
        let config = EnrichmentConfig::default();
        let anchor_id = new_v7();
        let stats = ScoreStats {
            mean: 0.30,
            stddev: 0.10,
            sample_count: 50,
        };
        let snapshot = snapshot_with(anchor_id, Tier::Strict, stats, 10);
        let t = effective_threshold(&snapshot, anchor_id, Tier::Strict, &config);
        assert!((t - 0.40).abs() < 1e-9);

        assert!(!is_highlight(0.35, t));
        assert!(is_highlight(0.41, t));
    }

    #[test]
    fn test_undersampled_cell_falls_back() {
        let config = EnrichmentConfig::default();
        let anchor_id = new_v7();
        let stats = score_stats_of(&[0.9, 0.9]).unwrap();
        let snapshot = snapshot_with(anchor_id, Tier::Dynamic, stats, 10);

        let t = effective_threshold(&snapshot, anchor_id, Tier::Dynamic, &config);
        assert!((t - config.fallback_threshold).abs() < 1e-9);
        assert!(t.is_finite());
    }

    #[test]
    fn test_missing_cell_falls_back() {
        let config = EnrichmentConfig::default();
        let snapshot = StatsSnapshot::empty(10);
        for tier in [Tier::Dynamic, Tier::Strict] {
            let t = effective_threshold(&snapshot, new_v7(), tier, &config);
            assert!((t - config.fallback_threshold).abs() < 1e-9);
        }
    }

    #[test]
    fn test_threshold_inclusive_at_boundary() {
        assert!(is_highlight(0.20, 0.20));
        assert!(is_highlight(0.40, 0.40));
        assert!(!is_highlight(0.1999, 0.20));
    }
}
