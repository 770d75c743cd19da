//! # veille-engine
//!
//! The semantic matching and tiered enrichment engine.
//!
//! Four components operate over the stores defined in veille-core:
//!
//! - [`compositor::AnchorCompositor`]: builds one composite vector per
//!   anchor from its components
//! - [`matcher::SimilarityMatcher`]: scores the unmatched-document
//!   frontier against active anchors and persists links
//! - [`stats::ThresholdStatsService`]: rolling per-anchor threshold
//!   statistics
//! - [`enrichment::EnrichmentClassifier`]: tier-aware highlight
//!   classification over the unresolved-link frontier
//!
//! [`pipeline::PipelineRunner`] sequences them into cycles.

pub mod compositor;
pub mod enrichment;
pub mod matcher;
pub mod pipeline;
pub mod similarity;
pub mod stats;

pub use compositor::{AnchorCompositor, CompositeAnchor};
pub use enrichment::{EnrichReport, EnrichmentClassifier, EnrichmentConfig};
pub use matcher::{MatchReport, MatcherConfig, SimilarityMatcher};
pub use pipeline::{EngineConfig, PipelineHandle, PipelineReport, PipelineRunner};
pub use similarity::{centroid, cosine_similarity, document_score, ChunkAggregation};
pub use stats::{score_stats_of, StatsSnapshot, ThresholdStatsService};
