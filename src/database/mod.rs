use std::sync::Arc;

use anyhow::Result;
use sqlx::{PgPool, Postgres, migrate::MigrateDatabase, postgres::PgPoolOptions};

use crate::config::Config;

pub mod document;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repositories;
pub mod store;

pub use memory::MemoryCollection;
pub use postgres::PgCollection;
pub use store::{Document, DocumentCollection, Filter, StoreError, StoreResult, Update};

pub async fn init_database(database_url: &str, max_connections: u32) -> Result<PgPool> {
    // Create database if it doesn't exist
    if !Postgres::database_exists(database_url).await.unwrap_or(false) {
        log::info!("Creating database {}", database_url);
        Postgres::create_database(database_url).await?;
    }

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    log::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(StoreError::from)?;
    log::info!("Migrations completed successfully");

    Ok(pool)
}

/// The shift collection selected by `DATABASE_URL`; `memory://` keeps
/// everything in process.
pub async fn connect_collection(config: &Config) -> Result<Arc<dyn DocumentCollection>> {
    if config.uses_memory_store() {
        log::warn!("Using the in-memory document store; data is lost on shutdown");
        return Ok(Arc::new(MemoryCollection::new()));
    }

    let pool = init_database(&config.database_url, config.database_max_connections).await?;
    Ok(Arc::new(PgCollection::new(pool, config.shift_collection.clone())))
}
