//! Similarity matcher: scores the unmatched-document frontier against
//! every active, composable anchor and persists the surviving links.
//!
//! The unit of atomicity is the batch: link upserts and `matched_at`
//! advances commit together through [`LinkStore::commit_match_batch`].
//! Score computation is pure, so a crashed batch can be retried from
//! scratch with no cleanup.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use veille_core::{
    defaults, AnchorStore, Document, DocumentStore, EmbeddingResolver, LinkStore, Result,
    ScoredLink,
};

use crate::compositor::{AnchorCompositor, CompositeAnchor};
use crate::similarity::{document_score, ChunkAggregation};

/// Matcher tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// Documents per batch.
    pub batch_size: i64,
    /// Minimum score for links whose document is in a noisy category.
    pub pre_filter_min_score: f32,
    /// Chunk-score reduction policy.
    pub aggregation: ChunkAggregation,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::MATCH_BATCH_SIZE,
            pre_filter_min_score: defaults::PRE_FILTER_MIN_SCORE,
            aggregation: ChunkAggregation::default(),
        }
    }
}

/// Outcome of one matcher invocation (possibly many batches).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub batches: u64,
    pub documents_matched: u64,
    pub documents_skipped: u64,
    pub links_written: u64,
    pub links_prefiltered: u64,
    pub anchors_composable: u64,
}

pub struct SimilarityMatcher {
    documents: Arc<dyn DocumentStore>,
    anchors: Arc<dyn AnchorStore>,
    links: Arc<dyn LinkStore>,
    resolver: Arc<dyn EmbeddingResolver>,
    config: MatcherConfig,
}

impl SimilarityMatcher {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        anchors: Arc<dyn AnchorStore>,
        links: Arc<dyn LinkStore>,
        resolver: Arc<dyn EmbeddingResolver>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            documents,
            anchors,
            links,
            resolver,
            config,
        }
    }

    /// Drain the match frontier.
    ///
    /// Composites are rebuilt once per invocation, never reused across
    /// invocations (anchors are mutable). Stops when the frontier is empty
    /// or a batch makes no progress (every remaining document skipped).
    pub async fn run(&self) -> Result<MatchReport> {
        let start = Instant::now();
        let mut report = MatchReport::default();

        let anchors = self.anchors.active_anchors().await?;
        if anchors.is_empty() {
            warn!(
                subsystem = "engine",
                component = "matcher",
                "No active anchors; leaving the frontier untouched"
            );
            return Ok(report);
        }

        let anchor_ids: Vec<Uuid> = anchors.iter().map(|a| a.id).collect();
        let components = self.anchors.components_for(&anchor_ids).await?;
        let compositor = AnchorCompositor::new(self.resolver.as_ref());
        let composites = compositor.composite_all(anchors, &components).await?;
        report.anchors_composable = composites.len() as u64;

        if composites.is_empty() {
            warn!(
                subsystem = "engine",
                component = "matcher",
                "No composable anchors; leaving the frontier untouched"
            );
            return Ok(report);
        }

        loop {
            let frontier = self.documents.match_frontier(self.config.batch_size).await?;
            if frontier.is_empty() {
                break;
            }

            let outcome = self.run_batch(&frontier, &composites).await?;
            report.batches += 1;
            report.documents_matched += outcome.matched;
            report.documents_skipped += outcome.skipped;
            report.links_written += outcome.links_written;
            report.links_prefiltered += outcome.prefiltered;

            // Skipped documents stay on the frontier; without progress the
            // next fetch would return the same set forever.
            if outcome.matched == 0 {
                break;
            }
        }

        info!(
            subsystem = "engine",
            component = "matcher",
            op = "run",
            batches = report.batches,
            documents_matched = report.documents_matched,
            documents_skipped = report.documents_skipped,
            link_count = report.links_written,
            links_prefiltered = report.links_prefiltered,
            duration_ms = start.elapsed().as_millis() as u64,
            "Matcher run complete"
        );

        Ok(report)
    }

    /// Score one batch of frontier documents and commit it atomically.
    async fn run_batch(
        &self,
        frontier: &[Document],
        composites: &[CompositeAnchor],
    ) -> Result<BatchOutcome> {
        let mut links: Vec<ScoredLink> = Vec::new();
        let mut matched_ids: Vec<Uuid> = Vec::with_capacity(frontier.len());
        let mut outcome = BatchOutcome::default();

        for document in frontier {
            let chunks = match self.resolver.document_vectors(document.id).await {
                Ok(chunks) => chunks,
                Err(e) if e.is_transient() => return Err(e),
                Err(e) => {
                    warn!(
                        subsystem = "engine",
                        component = "matcher",
                        document_id = %document.id,
                        error = %e,
                        "Document embedding unresolvable; will retry next run"
                    );
                    outcome.skipped += 1;
                    continue;
                }
            };

            if chunks.is_empty() {
                warn!(
                    subsystem = "engine",
                    component = "matcher",
                    document_id = %document.id,
                    "Indexed document has no vectors; will retry next run"
                );
                outcome.skipped += 1;
                continue;
            }

            for composite in composites {
                let Some(score) =
                    document_score(&chunks, &composite.vector, self.config.aggregation)
                else {
                    continue;
                };

                trace!(
                    subsystem = "engine",
                    component = "matcher",
                    document_id = %document.id,
                    anchor_id = %composite.anchor.id,
                    score,
                    "Scored candidate link"
                );

                if document.category.is_noisy() && score < self.config.pre_filter_min_score {
                    outcome.prefiltered += 1;
                    continue;
                }

                links.push(ScoredLink {
                    document_id: document.id,
                    anchor_id: composite.anchor.id,
                    score,
                });
            }

            matched_ids.push(document.id);
        }

        if !matched_ids.is_empty() {
            let written = self
                .links
                .commit_match_batch(&links, &matched_ids, Utc::now())
                .await?;
            outcome.links_written = written;
            outcome.matched = matched_ids.len() as u64;
        }

        debug!(
            subsystem = "engine",
            component = "matcher",
            op = "match_batch",
            batch_size = frontier.len(),
            documents_matched = outcome.matched,
            documents_skipped = outcome.skipped,
            link_count = outcome.links_written,
            links_prefiltered = outcome.prefiltered,
            "Match batch committed"
        );

        Ok(outcome)
    }
}

#[derive(Debug, Default)]
struct BatchOutcome {
    matched: u64,
    skipped: u64,
    links_written: u64,
    prefiltered: u64,
}
