// bistro_server/src/db/mod.rs

//! PostgreSQL implementations of the bistro store traits (sqlx runtime queries).

pub mod booking_store;
pub mod job_store;

pub use booking_store::PgBookingStore;
pub use job_store::PgJobStore;

use sqlx::PgPool;
use tracing::instrument;

const SCHEMA: &str = include_str!("../../schema.sql");

/// Creates the enums, tables and indexes if they do not exist yet.
#[instrument(name = "db::apply_schema", skip_all, err(Display))]
pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
  sqlx::raw_sql(SCHEMA).execute(pool).await?;
  tracing::info!("Database schema applied.");
  Ok(())
}

/// Round-trips a trivial query.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
  sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
