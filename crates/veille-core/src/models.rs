//! Core data model for the veille matching pipeline.
//!
//! Documents flow through four monotonic stages (ingested → indexed →
//! matched → enriched). Anchors are user-defined topics whose composite
//! vector is derived from their components at match time. Links connect
//! documents to anchors with a similarity score and, once classified,
//! a highlight flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a new UUIDv7 identifier (time-ordered, RFC 9562).
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

// =============================================================================
// SOURCE TAXONOMY & TIERS
// =============================================================================

/// Closed taxonomy of document source categories.
///
/// Stored as text in the database; the set is fixed at compile time and
/// drives tier assignment and the noisy-category pre-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    ThinkTank,
    AiResearch,
    ResearchInstitute,
    NonProfit,
    Academic,
    Advocacy,
    Publication,
    BusinessCouncil,
    Government,
    NewsMedia,
    MiscResearch,
}

impl SourceCategory {
    /// All categories, for iteration in tests and admin tooling.
    pub const ALL: [SourceCategory; 11] = [
        Self::ThinkTank,
        Self::AiResearch,
        Self::ResearchInstitute,
        Self::NonProfit,
        Self::Academic,
        Self::Advocacy,
        Self::Publication,
        Self::BusinessCouncil,
        Self::Government,
        Self::NewsMedia,
        Self::MiscResearch,
    ];

    /// Static category → tier map. Total: every category has a tier.
    pub fn tier(self) -> Tier {
        match self {
            Self::ThinkTank
            | Self::AiResearch
            | Self::ResearchInstitute
            | Self::NonProfit
            | Self::Academic
            | Self::Advocacy
            | Self::Publication
            | Self::BusinessCouncil => Tier::Fixed,
            Self::Government => Tier::Dynamic,
            Self::NewsMedia | Self::MiscResearch => Tier::Strict,
        }
    }

    /// Whether this category is in the high-volume, low-precision set that
    /// must clear the pre-filter minimum before a link is persisted.
    pub fn is_noisy(self) -> bool {
        matches!(self, Self::NewsMedia | Self::MiscResearch)
    }
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ThinkTank => "Think Tank",
            Self::AiResearch => "AI Research",
            Self::ResearchInstitute => "Research Institute",
            Self::NonProfit => "Non-Profit",
            Self::Academic => "Academic",
            Self::Advocacy => "Advocacy",
            Self::Publication => "Publication",
            Self::BusinessCouncil => "Business Council",
            Self::Government => "Government",
            Self::NewsMedia => "News Media",
            Self::MiscResearch => "Misc. Research",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for SourceCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Think Tank" => Ok(Self::ThinkTank),
            "AI Research" => Ok(Self::AiResearch),
            "Research Institute" => Ok(Self::ResearchInstitute),
            "Non-Profit" => Ok(Self::NonProfit),
            "Academic" => Ok(Self::Academic),
            "Advocacy" => Ok(Self::Advocacy),
            "Publication" => Ok(Self::Publication),
            "Business Council" => Ok(Self::BusinessCouncil),
            "Government" => Ok(Self::Government),
            "News Media" => Ok(Self::NewsMedia),
            "Misc. Research" => Ok(Self::MiscResearch),
            _ => Err(format!("Invalid source category: {}", s)),
        }
    }
}

/// Threshold policy tier, derived from a document's source category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Tier 1: fixed constant threshold.
    Fixed,
    /// Tier 2: dynamic threshold from the historical mean.
    Dynamic,
    /// Tier 3: strict threshold, historical mean plus one standard deviation.
    Strict,
}

impl Tier {
    /// Stable integer code used for grouping in the stats store.
    pub fn code(self) -> i16 {
        match self {
            Tier::Fixed => 1,
            Tier::Dynamic => 2,
            Tier::Strict => 3,
        }
    }

    /// Inverse of [`Tier::code`].
    pub fn from_code(code: i16) -> Option<Tier> {
        match code {
            1 => Some(Tier::Fixed),
            2 => Some(Tier::Dynamic),
            3 => Some(Tier::Strict),
            _ => None,
        }
    }
}

// =============================================================================
// DOCUMENTS & PIPELINE STATE
// =============================================================================

/// Pipeline stages a document advances through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Ingested,
    Indexed,
    Matched,
    Enriched,
}

/// An ingested document and its pipeline markers.
///
/// Timestamps are monotonic: once set they are never cleared except by an
/// explicit administrative reset. `enriched_at` non-null implies `matched_at`
/// non-null implies `indexed_at` non-null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub source_id: Uuid,
    pub title: String,
    pub url: String,
    pub category: SourceCategory,
    pub published_at: Option<DateTime<Utc>>,
    pub org_highlight: Option<bool>,
    pub ingested_at: DateTime<Utc>,
    pub indexed_at: Option<DateTime<Utc>>,
    pub matched_at: Option<DateTime<Utc>>,
    pub enriched_at: Option<DateTime<Utc>>,
}

impl Document {
    /// The timestamp column for a given stage, if set.
    pub fn stage_timestamp(&self, stage: PipelineStage) -> Option<DateTime<Utc>> {
        match stage {
            PipelineStage::Ingested => Some(self.ingested_at),
            PipelineStage::Indexed => self.indexed_at,
            PipelineStage::Matched => self.matched_at,
            PipelineStage::Enriched => self.enriched_at,
        }
    }
}

// =============================================================================
// ANCHORS & COMPONENTS
// =============================================================================

/// Kind of building block contributing to an anchor's composite vector.
///
/// A tagged variant, resolved by a single dispatching resolver. Adding a new
/// kind means extending the resolver, not the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// A curated tag with a precomputed embedding.
    Tag,
    /// A knowledge-base item; resolves to its indexed chunk vectors.
    KbItem,
    /// A directly-supplied hypothetical/reference document.
    HypotheticalDoc,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tag => write!(f, "tag"),
            Self::KbItem => write!(f, "kb_item"),
            Self::HypotheticalDoc => write!(f, "hypothetical_doc"),
        }
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tag" => Ok(Self::Tag),
            "kb_item" => Ok(Self::KbItem),
            "hypothetical_doc" => Ok(Self::HypotheticalDoc),
            _ => Err(format!("Invalid component kind: {}", s)),
        }
    }
}

/// One component of an anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorComponent {
    pub anchor_id: Uuid,
    pub kind: ComponentKind,
    /// Resolver key: tag name, KB source location, or hypothetical-doc id.
    pub component_ref: String,
}

/// A named, user-defined topic represented by a composite embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anchor {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// LINKS & HIGHLIGHTS
// =============================================================================

/// A scored association between one document and one anchor.
///
/// At most one link exists per (document, anchor) pair — enforced by a
/// unique key with upsert semantics, not by runtime checks. Highlight flags
/// are null until the classifier resolves them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: Uuid,
    pub document_id: Uuid,
    pub anchor_id: Uuid,
    /// Cosine similarity, clamped to [0, 1].
    pub score: f32,
    pub anchor_highlight: Option<bool>,
    pub created_at: DateTime<Utc>,
}

/// A resolved link joined to document and anchor identity, as exposed to
/// delivery/export collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightedLink {
    pub link_id: Uuid,
    pub document_id: Uuid,
    pub document_title: String,
    pub document_url: String,
    pub category: SourceCategory,
    pub anchor_id: Uuid,
    pub anchor_name: String,
    pub score: f32,
    pub anchor_highlight: bool,
    pub org_highlight: bool,
    pub published_at: Option<DateTime<Utc>>,
}

/// A classifier work item: an unresolved link joined to the document fields
/// the tier policy needs.
#[derive(Debug, Clone)]
pub struct UnresolvedLink {
    pub link_id: Uuid,
    pub document_id: Uuid,
    pub anchor_id: Uuid,
    pub score: f32,
    pub category: SourceCategory,
}

// =============================================================================
// THRESHOLD STATISTICS
// =============================================================================

/// Rolling aggregate of historical link scores for one (anchor, tier) cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub mean: f64,
    pub stddev: f64,
    pub sample_count: i64,
}
