//! Integration tests for the pipeline store contracts.
//!
//! These run against a live PostgreSQL with the migrations applied:
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/veille_test cargo test -p veille-db -- --ignored
//! ```
//!
//! Validates:
//! - frontier selection by null markers
//! - link uniqueness under repeated match commits (ON CONFLICT upsert)
//! - enrichment commit: flags, org-highlight recompute, enriched_at stamp
//! - linkless settlement
//! - administrative resets re-admit work

use chrono::Utc;
use uuid::Uuid;

use veille_core::{new_v7, DocumentStore, LinkFlag, LinkStore, PipelineStage, ScoredLink};
use veille_db::Database;

async fn connect() -> Database {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/veille_test".to_string());
    Database::connect(&url).await.expect("test database")
}

async fn seed_document(db: &Database, category: &str, indexed: bool) -> Uuid {
    let source_id = new_v7();
    sqlx::query("INSERT INTO source (id, name, category) VALUES ($1, $2, $3)")
        .bind(source_id)
        .bind(format!("src-{source_id}"))
        .bind(category)
        .execute(&db.pool)
        .await
        .unwrap();

    let id = new_v7();
    sqlx::query(
        "INSERT INTO document (id, source_id, title, url, category, ingested_at, indexed_at)
         VALUES ($1, $2, $3, $4, $5, now(), CASE WHEN $6 THEN now() END)",
    )
    .bind(id)
    .bind(source_id)
    .bind(format!("doc-{id}"))
    .bind(format!("https://example.org/{id}"))
    .bind(category)
    .bind(indexed)
    .execute(&db.pool)
    .await
    .unwrap();
    id
}

async fn seed_anchor(db: &Database, name_prefix: &str) -> Uuid {
    let id = new_v7();
    sqlx::query("INSERT INTO anchor (id, name) VALUES ($1, $2)")
        .bind(id)
        .bind(format!("{name_prefix}-{id}"))
        .execute(&db.pool)
        .await
        .unwrap();
    id
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn test_match_frontier_selects_only_indexed_unmatched() {
    let db = connect().await;
    let ready = seed_document(&db, "Think Tank", true).await;
    let unindexed = seed_document(&db, "Think Tank", false).await;

    let frontier = db.documents.match_frontier(1_000).await.unwrap();
    let ids: Vec<Uuid> = frontier.iter().map(|d| d.id).collect();
    assert!(ids.contains(&ready));
    assert!(!ids.contains(&unindexed));
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn test_repeated_match_commit_upserts_single_link() {
    let db = connect().await;
    let doc = seed_document(&db, "Academic", true).await;
    let anchor = seed_anchor(&db, "upsert").await;

    let scored = ScoredLink {
        document_id: doc,
        anchor_id: anchor,
        score: 0.6,
    };
    db.links
        .commit_match_batch(&[scored.clone()], &[doc], Utc::now())
        .await
        .unwrap();
    db.links
        .commit_match_batch(
            &[ScoredLink {
                score: 0.7,
                ..scored
            }],
            &[doc],
            Utc::now(),
        )
        .await
        .unwrap();

    let links = db.links.links_for_document(doc).await.unwrap();
    assert_eq!(links.len(), 1);
    assert!((links[0].score - 0.7).abs() < 1e-6);
    assert!(links[0].anchor_highlight.is_none());

    // matched_at advanced once and not rewritten.
    let fetched = db.documents.get(doc).await.unwrap();
    assert!(fetched.matched_at.is_some());
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn test_enrichment_commit_recomputes_org_highlight() {
    let db = connect().await;
    let doc = seed_document(&db, "Government", true).await;
    let anchor_a = seed_anchor(&db, "enrich-a").await;
    let anchor_b = seed_anchor(&db, "enrich-b").await;

    db.links
        .commit_match_batch(
            &[
                ScoredLink {
                    document_id: doc,
                    anchor_id: anchor_a,
                    score: 0.1,
                },
                ScoredLink {
                    document_id: doc,
                    anchor_id: anchor_b,
                    score: 0.9,
                },
            ],
            &[doc],
            Utc::now(),
        )
        .await
        .unwrap();

    let unresolved = db.links.unresolved(1_000).await.unwrap();
    let mine: Vec<_> = unresolved
        .iter()
        .filter(|l| l.document_id == doc)
        .collect();
    assert_eq!(mine.len(), 2);

    let flags: Vec<LinkFlag> = mine
        .iter()
        .map(|l| LinkFlag {
            link_id: l.link_id,
            document_id: l.document_id,
            anchor_highlight: l.score >= 0.5,
        })
        .collect();
    db.links
        .commit_enrichment_batch(&flags, Utc::now())
        .await
        .unwrap();

    let fetched = db.documents.get(doc).await.unwrap();
    assert_eq!(fetched.org_highlight, Some(true));
    assert!(fetched.enriched_at.is_some());

    // Frontier is drained for this document.
    let unresolved = db.links.unresolved(1_000).await.unwrap();
    assert!(unresolved.iter().all(|l| l.document_id != doc));
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn test_settle_linkless_document() {
    let db = connect().await;
    let doc = seed_document(&db, "News Media", true).await;

    // Matched with zero surviving links (all pre-filtered out upstream).
    db.links
        .commit_match_batch(&[], &[doc], Utc::now())
        .await
        .unwrap();

    let settled = db.documents.settle_linkless(Utc::now()).await.unwrap();
    assert!(settled >= 1);

    let fetched = db.documents.get(doc).await.unwrap();
    assert!(fetched.enriched_at.is_some());
    assert_eq!(fetched.org_highlight, Some(false));
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn test_reset_matched_readmits_and_deletes_links() {
    let db = connect().await;
    let doc = seed_document(&db, "Academic", true).await;
    let anchor = seed_anchor(&db, "reset").await;

    db.links
        .commit_match_batch(
            &[ScoredLink {
                document_id: doc,
                anchor_id: anchor,
                score: 0.5,
            }],
            &[doc],
            Utc::now(),
        )
        .await
        .unwrap();

    db.documents
        .reset_stage(doc, PipelineStage::Matched)
        .await
        .unwrap();

    let fetched = db.documents.get(doc).await.unwrap();
    assert!(fetched.matched_at.is_none());
    assert!(fetched.enriched_at.is_none());
    assert!(db.links.links_for_document(doc).await.unwrap().is_empty());

    // Back on the frontier.
    let frontier = db.documents.match_frontier(10_000).await.unwrap();
    assert!(frontier.iter().any(|d| d.id == doc));
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn test_reset_anchor_flags_reopens_classifier_frontier() {
    let db = connect().await;
    let doc = seed_document(&db, "Think Tank", true).await;
    let anchor = seed_anchor(&db, "reflag").await;

    db.links
        .commit_match_batch(
            &[ScoredLink {
                document_id: doc,
                anchor_id: anchor,
                score: 0.8,
            }],
            &[doc],
            Utc::now(),
        )
        .await
        .unwrap();
    let unresolved = db.links.unresolved(1_000).await.unwrap();
    let link = unresolved
        .iter()
        .find(|l| l.document_id == doc)
        .expect("link on frontier");
    db.links
        .commit_enrichment_batch(
            &[LinkFlag {
                link_id: link.link_id,
                document_id: doc,
                anchor_highlight: true,
            }],
            Utc::now(),
        )
        .await
        .unwrap();

    let reset = db.links.reset_anchor_flags(anchor).await.unwrap();
    assert_eq!(reset, 1);

    let unresolved = db.links.unresolved(1_000).await.unwrap();
    assert!(unresolved.iter().any(|l| l.document_id == doc));
}
