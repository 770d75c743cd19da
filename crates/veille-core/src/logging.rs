//! Structured logging schema and field name constants for veille.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Batch aborted, requires operator attention |
//! | WARN  | Recoverable issue, item skipped or fallback applied |
//! | INFO  | Lifecycle events, batch completions |
//! | DEBUG | Decision points, threshold selections |
//! | TRACE | Per-item scores and per-link decisions |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "engine", "db", "pipeline"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "matcher", "compositor", "enrichment", "stats", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "match_batch", "composite", "refresh", "classify_batch"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Document UUID being operated on.
pub const DOCUMENT_ID: &str = "document_id";

/// Anchor UUID being operated on.
pub const ANCHOR_ID: &str = "anchor_id";

/// Link UUID being operated on.
pub const LINK_ID: &str = "link_id";

/// Source category of the document.
pub const CATEGORY: &str = "category";

/// Threshold tier applied to a link.
pub const TIER: &str = "tier";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Documents processed in a batch.
pub const BATCH_SIZE: &str = "batch_size";

/// Links written or classified.
pub const LINK_COUNT: &str = "link_count";

/// Similarity score of a candidate link.
pub const SCORE: &str = "score";

/// Effective threshold a score was compared against.
pub const THRESHOLD: &str = "threshold";

/// Samples behind a statistics cell.
pub const SAMPLE_COUNT: &str = "sample_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
