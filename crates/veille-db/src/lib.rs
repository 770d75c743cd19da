//! # veille-db
//!
//! PostgreSQL + pgvector persistence layer for veille.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for documents, anchors, links, and stats
//! - The pgvector-backed embedding resolver
//! - The delivery query surface and administrative resets
//!
//! ## Example
//!
//! ```rust,ignore
//! use veille_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/veille").await?;
//!     let frontier = db.documents.match_frontier(50).await?;
//!     println!("{} documents awaiting matching", frontier.len());
//!     Ok(())
//! }
//! ```

pub mod anchors;
pub mod documents;
pub mod links;
pub mod pool;
pub mod stats;
pub mod vectors;

// Re-export core types
pub use veille_core::*;

pub use anchors::PgAnchorRepository;
pub use documents::PgDocumentRepository;
pub use links::PgLinkRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use stats::PgStatsRepository;
pub use vectors::PgEmbeddingResolver;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Document repository: frontiers, marker advances, resets.
    pub documents: PgDocumentRepository,
    /// Anchor repository: active anchors and their components.
    pub anchors: PgAnchorRepository,
    /// Link repository: upserts, classification, delivery queries.
    pub links: PgLinkRepository,
    /// Historical score aggregation for threshold statistics.
    pub stats: PgStatsRepository,
    /// pgvector-backed embedding lookups.
    pub resolver: PgEmbeddingResolver,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            documents: PgDocumentRepository::new(pool.clone()),
            anchors: PgAnchorRepository::new(pool.clone()),
            links: PgLinkRepository::new(pool.clone()),
            stats: PgStatsRepository::new(pool.clone()),
            resolver: PgEmbeddingResolver::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
