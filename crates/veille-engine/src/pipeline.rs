//! Pipeline runner: sequences match → stats refresh → enrich as one cycle
//! and optionally loops forever as a background worker.
//!
//! Processing is single-pipeline, batch-sequential. Cancellation is by
//! shutdown signal between cycles — never mid-batch; an aborted batch is
//! simply re-selected by the next cycle's frontier queries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info, instrument};

use veille_core::{
    defaults, AnchorStore, DocumentStore, EmbeddingResolver, LinkStore, Result, StatsStore,
};

use crate::enrichment::{EnrichReport, EnrichmentClassifier, EnrichmentConfig};
use crate::matcher::{MatchReport, MatcherConfig, SimilarityMatcher};
use crate::similarity::ChunkAggregation;
use crate::stats::ThresholdStatsService;

/// Configuration for the whole engine, assembled from the environment.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub matcher: MatcherConfig,
    pub enrichment: EnrichmentConfig,
    /// Trailing window for threshold statistics, in days.
    pub stats_window_days: i64,
    /// Minimum samples before a statistics cell is trusted.
    pub stats_min_samples: i64,
    /// Sleep between cycles when the frontiers are empty.
    pub poll_interval_ms: u64,
    /// Whether the background loop processes at all.
    pub enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            enrichment: EnrichmentConfig::default(),
            stats_window_days: defaults::STATS_WINDOW_DAYS,
            stats_min_samples: defaults::STATS_MIN_SAMPLES,
            poll_interval_ms: defaults::PIPELINE_POLL_INTERVAL_MS,
            enabled: true,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `VEILLE_ENABLED` | `true` | Enable/disable the pipeline loop |
    /// | `VEILLE_MATCH_BATCH_SIZE` | `50` | Documents per match batch |
    /// | `VEILLE_ENRICH_BATCH_SIZE` | `200` | Links per enrichment batch |
    /// | `VEILLE_PRE_FILTER_MIN_SCORE` | `0.25` | Noisy-category pre-filter minimum |
    /// | `VEILLE_TIER1_THRESHOLD` | `0.20` | Tier 1 fixed threshold |
    /// | `VEILLE_STATS_WINDOW_DAYS` | `30` | Stats trailing window |
    /// | `VEILLE_STATS_MIN_SAMPLES` | `10` | Minimum samples per stats cell |
    /// | `VEILLE_STATS_FALLBACK_THRESHOLD` | `0.35` | Fallback threshold |
    /// | `VEILLE_CHUNK_AGGREGATION` | `mean_top_k` | `max` or `mean_top_k` |
    /// | `VEILLE_CHUNK_TOP_K` | `5` | K for `mean_top_k` |
    /// | `VEILLE_POLL_INTERVAL_MS` | `60000` | Sleep between idle cycles |
    pub fn from_env() -> Self {
        let defaults_cfg = Self::default();

        let enabled = std::env::var("VEILLE_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let aggregation = match std::env::var("VEILLE_CHUNK_AGGREGATION").as_deref() {
            Ok("max") => ChunkAggregation::Max,
            _ => {
                let k = env_parse("VEILLE_CHUNK_TOP_K", defaults::CHUNK_TOP_K);
                ChunkAggregation::MeanTopK(k.max(1))
            }
        };

        Self {
            matcher: MatcherConfig {
                batch_size: env_parse("VEILLE_MATCH_BATCH_SIZE", defaults_cfg.matcher.batch_size),
                pre_filter_min_score: env_parse(
                    "VEILLE_PRE_FILTER_MIN_SCORE",
                    defaults_cfg.matcher.pre_filter_min_score,
                ),
                aggregation,
            },
            enrichment: EnrichmentConfig {
                batch_size: env_parse(
                    "VEILLE_ENRICH_BATCH_SIZE",
                    defaults_cfg.enrichment.batch_size,
                ),
                tier1_threshold: env_parse(
                    "VEILLE_TIER1_THRESHOLD",
                    defaults_cfg.enrichment.tier1_threshold,
                ),
                fallback_threshold: env_parse(
                    "VEILLE_STATS_FALLBACK_THRESHOLD",
                    defaults_cfg.enrichment.fallback_threshold,
                ),
            },
            stats_window_days: env_parse("VEILLE_STATS_WINDOW_DAYS", defaults_cfg.stats_window_days),
            stats_min_samples: env_parse("VEILLE_STATS_MIN_SAMPLES", defaults_cfg.stats_min_samples),
            poll_interval_ms: env_parse("VEILLE_POLL_INTERVAL_MS", defaults_cfg.poll_interval_ms),
            enabled,
        }
    }
}

fn env_parse<T: std::str::FromStr + Copy>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Outcome of one full pipeline cycle.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub matched: MatchReport,
    pub enriched: EnrichReport,
    pub stats_cells: usize,
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Whether this cycle moved any work through the pipeline.
    pub fn made_progress(&self) -> bool {
        self.matched.documents_matched > 0
            || self.enriched.links_classified > 0
            || self.enriched.documents_settled > 0
    }
}

/// Handle for controlling a running pipeline loop.
pub struct PipelineHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl PipelineHandle {
    /// Signal the loop to stop after the current cycle.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| veille_core::Error::Internal("Failed to send shutdown signal".into()))
    }
}

/// Sequences the engine components over the shared stores.
pub struct PipelineRunner {
    matcher: SimilarityMatcher,
    stats: ThresholdStatsService,
    classifier: EnrichmentClassifier,
    config: EngineConfig,
}

impl PipelineRunner {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        anchors: Arc<dyn AnchorStore>,
        links: Arc<dyn LinkStore>,
        stats_store: Arc<dyn StatsStore>,
        resolver: Arc<dyn EmbeddingResolver>,
        config: EngineConfig,
    ) -> Self {
        let matcher = SimilarityMatcher::new(
            documents.clone(),
            anchors,
            links.clone(),
            resolver,
            config.matcher,
        );
        let stats = ThresholdStatsService::new(stats_store)
            .with_window_days(config.stats_window_days)
            .with_min_samples(config.stats_min_samples);
        let classifier = EnrichmentClassifier::new(links, documents, config.enrichment);

        Self {
            matcher,
            stats,
            classifier,
            config,
        }
    }

    /// Run one match → refresh → enrich cycle.
    ///
    /// The statistics snapshot is taken after matching so the freshest
    /// links inform the thresholds; a snapshot from before this cycle
    /// would also be correct (refresh is decoupled by contract).
    pub async fn run_cycle(&self) -> Result<PipelineReport> {
        let start = Instant::now();

        let matched = self.matcher.run().await?;
        let snapshot = self.stats.refresh().await?;
        let enriched = self.classifier.run(&snapshot).await?;

        let report = PipelineReport {
            matched,
            enriched,
            stats_cells: snapshot.cell_count(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            subsystem = "pipeline",
            component = "runner",
            op = "cycle",
            documents_matched = report.matched.documents_matched,
            links_written = report.matched.links_written,
            links_classified = report.enriched.links_classified,
            links_highlighted = report.enriched.links_highlighted,
            documents_settled = report.enriched.documents_settled,
            stats_cells = report.stats_cells,
            duration_ms = report.duration_ms,
            "Pipeline cycle complete"
        );

        Ok(report)
    }

    /// Start the background loop and return a handle for control.
    pub fn start(self) -> PipelineHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            self.run_loop(&mut shutdown_rx).await;
        });

        PipelineHandle { shutdown_tx }
    }

    /// Cycle until shut down. A failed cycle is logged and retried after
    /// the poll interval — the frontier is unchanged, so nothing is lost.
    #[instrument(skip(self, shutdown_rx))]
    async fn run_loop(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!(
                subsystem = "pipeline",
                component = "runner",
                "Pipeline disabled by configuration; loop not started"
            );
            return;
        }

        info!(
            subsystem = "pipeline",
            component = "runner",
            poll_interval_ms = self.config.poll_interval_ms,
            "Pipeline loop started"
        );

        loop {
            match self.run_cycle().await {
                Ok(report) if report.made_progress() => {
                    // More work may be waiting behind the batch limits.
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(
                        subsystem = "pipeline",
                        component = "runner",
                        error = %e,
                        "Pipeline cycle failed; will retry"
                    );
                }
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(
                        subsystem = "pipeline",
                        component = "runner",
                        "Pipeline loop stopped"
                    );
                    return;
                }
                _ = sleep(Duration::from_millis(self.config.poll_interval_ms)) => {}
            }
        }
    }
}
