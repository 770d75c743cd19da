//! Cosine similarity and chunk-score aggregation.
//!
//! Documents are represented by one or more chunk vectors; anchors by a
//! single composite vector. Reducing the per-chunk similarities to one
//! document-anchor score is a named, configurable policy rather than an
//! implicit choice.

use pgvector::Vector;

use veille_core::defaults::CHUNK_TOP_K;

/// Policy for reducing multiple chunk similarities to one document score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkAggregation {
    /// The single best chunk wins. Sensitive to one-off flukes in long
    /// documents, but never under-reports a strong local match.
    Max,
    /// Mean of the top-K chunk similarities. K > 1 damps single-chunk
    /// flukes while still rewarding concentrated relevance.
    MeanTopK(usize),
}

impl Default for ChunkAggregation {
    fn default() -> Self {
        ChunkAggregation::MeanTopK(CHUNK_TOP_K)
    }
}

impl std::fmt::Display for ChunkAggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Max => write!(f, "max"),
            Self::MeanTopK(k) => write!(f, "mean_top_{}", k),
        }
    }
}

/// Cosine similarity between two vectors, clamped to [0, 1].
///
/// Dimension mismatches and zero-norm inputs score 0.0 rather than
/// erroring: a degenerate vector can never produce a match.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }

    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return 0.0;
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    sim.clamp(0.0, 1.0) as f32
}

/// Score one document against one composite vector under the given policy.
///
/// Returns `None` when the document has no chunk vectors.
pub fn document_score(
    chunks: &[Vector],
    composite: &Vector,
    policy: ChunkAggregation,
) -> Option<f32> {
    if chunks.is_empty() {
        return None;
    }

    let mut sims: Vec<f32> = chunks
        .iter()
        .map(|c| cosine_similarity(c.as_slice(), composite.as_slice()))
        .collect();

    let score = match policy {
        ChunkAggregation::Max => sims.iter().cloned().fold(0.0f32, f32::max),
        ChunkAggregation::MeanTopK(k) => {
            let k = k.max(1);
            sims.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
            let top = &sims[..k.min(sims.len())];
            top.iter().sum::<f32>() / top.len() as f32
        }
    };

    Some(score.clamp(0.0, 1.0))
}

/// Arithmetic mean of a non-empty set of equal-dimension vectors.
///
/// Returns `None` for an empty set or mismatched dimensions. Deterministic:
/// the same inputs in the same order always produce the same centroid.
pub fn centroid(vectors: &[Vector]) -> Option<Vector> {
    let first = vectors.first()?;
    let dim = first.as_slice().len();
    if dim == 0 || vectors.iter().any(|v| v.as_slice().len() != dim) {
        return None;
    }

    let mut acc = vec![0.0f64; dim];
    for v in vectors {
        for (slot, x) in acc.iter_mut().zip(v.as_slice()) {
            *slot += *x as f64;
        }
    }
    let n = vectors.len() as f64;
    let mean: Vec<f32> = acc.into_iter().map(|x| (x / n) as f32).collect();
    Some(Vector::from(mean))
}
