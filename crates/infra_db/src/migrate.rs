//! Schema migrations embedded at build time

use sqlx::migrate::Migrator;
use tracing::info;

use crate::error::DatabaseError;
use crate::pool::DatabasePool;

/// Migrations under `crates/infra_db/migrations`
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies any pending migrations
///
/// Safe to call on every start; applied versions are skipped.
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    info!(available = MIGRATOR.iter().count(), "Running database migrations");
    MIGRATOR.run(pool).await?;
    info!("Database schema is up to date");
    Ok(())
}
