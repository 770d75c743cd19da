//! Core traits for veille abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability. The engine crate
//! programs exclusively against them; veille-db provides the PostgreSQL
//! implementations and the test suites provide in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// BATCH WRITE REQUESTS
// =============================================================================

/// A candidate link produced by the matcher, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLink {
    pub document_id: Uuid,
    pub anchor_id: Uuid,
    pub score: f32,
}

/// A classifier decision for one link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkFlag {
    pub link_id: Uuid,
    pub document_id: Uuid,
    pub anchor_highlight: bool,
}

/// One (anchor, tier) statistics cell as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorTierStats {
    pub anchor_id: Uuid,
    pub tier: Tier,
    pub stats: ScoreStats,
}

// =============================================================================
// DOCUMENT STORE
// =============================================================================

/// Repository for documents and their pipeline markers.
///
/// Frontier queries select by null-marker predicates, so re-running against
/// an unfinished frontier re-selects the same unfinished work. Timestamp
/// advances are idempotent: a marker already set is left untouched by
/// ordinary processing and cleared only by an explicit reset.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by id.
    async fn get(&self, id: Uuid) -> Result<Document>;

    /// Documents awaiting matching: indexed but `matched_at IS NULL`.
    async fn match_frontier(&self, limit: i64) -> Result<Vec<Document>>;

    /// Stamp `enriched_at` (and recompute `org_highlight`) for documents
    /// that are matched, not yet enriched, and have no unresolved links.
    /// This is how a document whose candidates were all pre-filtered out
    /// reaches its terminal state: enriched, no highlights.
    ///
    /// Returns the number of documents settled.
    async fn settle_linkless(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Administrative reset: clear the given stage marker and everything
    /// downstream of it, re-admitting the document to that frontier.
    /// Resetting `Matched` or earlier also deletes the document's links;
    /// resetting `Enriched` nulls its links' highlight flags instead.
    async fn reset_stage(&self, document_id: Uuid, stage: PipelineStage) -> Result<()>;
}

// =============================================================================
// ANCHOR STORE
// =============================================================================

/// Read-only repository for anchors and their components.
///
/// Anchors are created and edited by administrative tooling; the engine
/// only ever reads them. Composite vectors are never persisted — they are
/// recomputed from components on every matcher invocation.
#[async_trait]
pub trait AnchorStore: Send + Sync {
    /// All active anchors.
    async fn active_anchors(&self) -> Result<Vec<Anchor>>;

    /// Components for the given anchors, in declaration order.
    async fn components_for(&self, anchor_ids: &[Uuid]) -> Result<Vec<AnchorComponent>>;
}

// =============================================================================
// LINK STORE
// =============================================================================

/// Repository for document-anchor links.
///
/// The unique key on (document, anchor) plus upsert semantics makes
/// duplicate links structurally impossible — repeated matcher runs over
/// the same pair update the score rather than inserting a second row.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Persist a matcher batch atomically: upsert every scored link and
    /// advance `matched_at` for every listed document, as one unit.
    /// A crash before commit leaves the frontier unchanged.
    ///
    /// Returns the number of links written.
    async fn commit_match_batch(
        &self,
        links: &[ScoredLink],
        matched_document_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64>;

    /// Links awaiting classification: `anchor_highlight IS NULL`, joined to
    /// the document's category, restricted to active anchors.
    async fn unresolved(&self, limit: i64) -> Result<Vec<UnresolvedLink>>;

    /// Persist a classifier batch atomically: write every highlight flag,
    /// recompute `org_highlight` for every touched document, and stamp
    /// `enriched_at` for those documents, as one unit.
    ///
    /// Returns the number of flags written.
    async fn commit_enrichment_batch(&self, flags: &[LinkFlag], now: DateTime<Utc>)
        -> Result<u64>;

    /// All links for one document.
    async fn links_for_document(&self, document_id: Uuid) -> Result<Vec<Link>>;

    /// Delivery query surface: all resolved links created inside the window,
    /// joined to document and anchor identity. The sole contract delivery
    /// and export collaborators may depend on.
    async fn highlights_in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HighlightedLink>>;

    /// Administrative reset for an anchor scope: null the highlight flags on
    /// all of the anchor's links, re-admitting them to the classifier
    /// frontier. Returns the number of links reset.
    async fn reset_anchor_flags(&self, anchor_id: Uuid) -> Result<u64>;
}

// =============================================================================
// STATS STORE
// =============================================================================

/// Read side of the threshold statistics service.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Per-(anchor, tier) mean and standard deviation of link scores created
    /// within the trailing window, restricted to active anchors.
    async fn score_stats(&self, window_days: i64) -> Result<Vec<AnchorTierStats>>;
}

// =============================================================================
// EMBEDDING RESOLVER
// =============================================================================

/// Vector-store lookups for anchor components and document chunks.
///
/// A pure lookup layer: the resolver never computes embeddings, it only
/// retrieves vectors produced by the (external) indexing pipeline. One
/// dispatching implementation covers every component kind.
#[async_trait]
pub trait EmbeddingResolver: Send + Sync {
    /// All vectors for one anchor component. A tag resolves to exactly one
    /// vector; KB items and hypothetical documents resolve to their chunk
    /// vectors. An empty result means the component is unresolvable.
    async fn resolve_component(
        &self,
        kind: ComponentKind,
        component_ref: &str,
    ) -> Result<Vec<Vector>>;

    /// Chunk vectors for one document, in chunk order. An empty result means
    /// the document has not been indexed into the vector store.
    async fn document_vectors(&self, document_id: Uuid) -> Result<Vec<Vector>>;
}
