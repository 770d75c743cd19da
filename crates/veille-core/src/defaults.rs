//! Centralized default constants for the veille system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers. When adding constants, place them in the appropriate
//! section and document the rationale for the chosen value.

// =============================================================================
// EMBEDDING
// =============================================================================

/// Embedding vector dimension (all-MiniLM-L6-v2 and compatible models).
pub const EMBED_DIMENSION: usize = 384;

// =============================================================================
// MATCHING
// =============================================================================

/// Documents per matcher batch. Matches the original analysis batch size;
/// large enough to amortize anchor loading, small enough that a retried
/// batch is cheap.
pub const MATCH_BATCH_SIZE: i64 = 50;

/// Minimum score a candidate link must reach when the document's category
/// is in the noisy set (News Media, Misc. Research). Applied at match time,
/// before any tiering logic.
pub const PRE_FILTER_MIN_SCORE: f32 = 0.25;

/// Top-K chunk similarities averaged by the default chunk-aggregation
/// policy. Five damps single-chunk flukes without drowning strong local
/// matches in a long document's tail.
pub const CHUNK_TOP_K: usize = 5;

// =============================================================================
// ENRICHMENT
// =============================================================================

/// Unresolved links per classifier batch.
pub const ENRICH_BATCH_SIZE: i64 = 200;

/// Tier 1 fixed highlight threshold.
pub const TIER1_THRESHOLD: f32 = 0.20;

// =============================================================================
// THRESHOLD STATISTICS
// =============================================================================

/// Trailing window, in days, of link scores feeding the per-anchor stats.
pub const STATS_WINDOW_DAYS: i64 = 30;

/// Minimum samples an (anchor, tier) cell needs before its statistics are
/// trusted; below this the fallback threshold applies.
pub const STATS_MIN_SAMPLES: i64 = 10;

/// Threshold used when an (anchor, tier) cell has too few samples.
/// Sits between the Tier 1 constant and typical Tier 3 effective
/// thresholds, so sparse anchors neither flood nor starve.
pub const STATS_FALLBACK_THRESHOLD: f64 = 0.35;

// =============================================================================
// PIPELINE RUNNER
// =============================================================================

/// Sleep between pipeline cycles when the frontiers are empty.
pub const PIPELINE_POLL_INTERVAL_MS: u64 = 60_000;

// =============================================================================
// DATABASE
// =============================================================================

/// Internal "fetch everything" limit for aggregation queries.
pub const INTERNAL_FETCH_LIMIT: i64 = 10_000;
