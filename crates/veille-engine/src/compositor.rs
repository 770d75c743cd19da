//! Anchor composite-vector construction.
//!
//! An anchor's effective vector is the centroid of its resolved component
//! vectors, recomputed on demand. Composites are never cached across runs:
//! anchors are mutable, and a stale centroid is worse than a redundant
//! recomputation.

use pgvector::Vector;
use tracing::warn;

use veille_core::{Anchor, AnchorComponent, EmbeddingResolver, Result};

use crate::similarity::centroid;

/// An active anchor paired with its freshly computed composite vector.
#[derive(Debug, Clone)]
pub struct CompositeAnchor {
    pub anchor: Anchor,
    pub vector: Vector,
}

/// Builds composite vectors from anchor components via the resolver.
pub struct AnchorCompositor<'a> {
    resolver: &'a dyn EmbeddingResolver,
}

impl<'a> AnchorCompositor<'a> {
    pub fn new(resolver: &'a dyn EmbeddingResolver) -> Self {
        Self { resolver }
    }

    /// Compute the composite vector for one anchor.
    ///
    /// Each component contributes exactly one vector: multi-chunk components
    /// (KB items, hypothetical documents) are collapsed to their chunk mean
    /// first, then the composite is the centroid across components.
    ///
    /// Components that fail to resolve are skipped with a warning; only
    /// transient store failures propagate. Returns `Ok(None)` when zero
    /// components resolve: the anchor is not composable and the matcher
    /// must skip it.
    pub async fn composite(
        &self,
        anchor: &Anchor,
        components: &[AnchorComponent],
    ) -> Result<Option<Vector>> {
        let mut component_vectors: Vec<Vector> = Vec::with_capacity(components.len());

        for component in components {
            let chunks = match self
                .resolver
                .resolve_component(component.kind, &component.component_ref)
                .await
            {
                Ok(chunks) => chunks,
                Err(e) if e.is_transient() => return Err(e),
                Err(e) => {
                    warn!(
                        subsystem = "engine",
                        component = "compositor",
                        anchor_id = %anchor.id,
                        component_kind = %component.kind,
                        component_ref = %component.component_ref,
                        error = %e,
                        "Skipping unresolvable anchor component"
                    );
                    continue;
                }
            };

            match centroid(&chunks) {
                Some(v) => component_vectors.push(v),
                None => {
                    warn!(
                        subsystem = "engine",
                        component = "compositor",
                        anchor_id = %anchor.id,
                        component_kind = %component.kind,
                        component_ref = %component.component_ref,
                        "Anchor component resolved to no usable vectors"
                    );
                }
            }
        }

        Ok(centroid(&component_vectors))
    }

    /// Compose every anchor in the list, dropping the non-composable ones.
    ///
    /// Non-composable anchors are logged and skipped; they never block
    /// other anchors from matching.
    pub async fn composite_all(
        &self,
        anchors: Vec<Anchor>,
        components: &[AnchorComponent],
    ) -> Result<Vec<CompositeAnchor>> {
        let mut out = Vec::with_capacity(anchors.len());
        for anchor in anchors {
            let own: Vec<AnchorComponent> = components
                .iter()
                .filter(|c| c.anchor_id == anchor.id)
                .cloned()
                .collect();

            match self.composite(&anchor, &own).await? {
                Some(vector) => out.push(CompositeAnchor { anchor, vector }),
                None => {
                    warn!(
                        subsystem = "engine",
                        component = "compositor",
                        anchor_id = %anchor.id,
                        anchor_name = %anchor.name,
                        "Anchor has no composable components; skipping"
                    );
                }
            }
        }
        Ok(out)
    }
}
