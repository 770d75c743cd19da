//! veilled - the veille pipeline daemon.
//!
//! Connects to PostgreSQL, assembles the engine components over the
//! database repositories, and runs the match → stats → enrich loop until
//! interrupted. All tuning comes from the environment; see
//! [`EngineConfig::from_env`] for the variable table.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use veille_db::{
    Database, PgAnchorRepository, PgDocumentRepository, PgEmbeddingResolver, PgLinkRepository,
    PgStatsRepository,
};
use veille_engine::{EngineConfig, PipelineRunner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "veilled=info,veille_engine=info,veille_db=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let db = Database::connect(&database_url).await?;
    let pool = db.pool().clone();

    let config = EngineConfig::from_env();
    info!(
        subsystem = "pipeline",
        component = "daemon",
        ?config,
        "Starting veilled"
    );

    let runner = PipelineRunner::new(
        Arc::new(PgDocumentRepository::new(pool.clone())),
        Arc::new(PgAnchorRepository::new(pool.clone())),
        Arc::new(PgLinkRepository::new(pool.clone())),
        Arc::new(PgStatsRepository::new(pool.clone())),
        Arc::new(PgEmbeddingResolver::new(pool)),
        config,
    );

    let handle = runner.start();

    tokio::signal::ctrl_c().await?;
    info!(
        subsystem = "pipeline",
        component = "daemon",
        "Interrupt received; shutting down after the current cycle"
    );
    handle.shutdown().await?;

    Ok(())
}
