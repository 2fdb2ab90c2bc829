// bistro_server/src/main.rs

mod config;
mod db;
mod errors;
mod models;
mod state;
mod web;

use crate::config::AppConfig;
use crate::db::{PgBookingStore, PgJobStore};
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use bistro::{BookingService, BookingStore, ExpiryHandler, JobRegistry, JobRunner, JobStore, Reconciler, EXPIRE_BOOKING};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting bistro server...");

  let app_config = AppConfig::from_env().context("Failed to load application configuration")?;

  let db_pool = PgPoolOptions::new()
    .connect(&app_config.database_url)
    .await
    .context("Failed to connect to the database")?;
  tracing::info!("Successfully connected to the database.");

  if app_config.apply_schema {
    db::apply_schema(&db_pool).await.context("Failed to apply database schema")?;
  }

  let bookings: Arc<dyn BookingStore> = Arc::new(PgBookingStore::new(db_pool.clone()));
  let jobs: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db_pool.clone()));

  let registry = Arc::new(JobRegistry::new());
  registry.register(EXPIRE_BOOKING, Arc::new(ExpiryHandler::new(bookings.clone())));

  let runner = if app_config.runner_enabled {
    let reconciler = Reconciler::new(bookings.clone(), jobs.clone(), app_config.branch_offset);
    let runner = JobRunner::new(jobs.clone(), registry, app_config.runner_config()).with_reconciler(reconciler);
    Some(runner.start())
  } else {
    tracing::warn!("Job runner disabled; expiry jobs will only run on other instances.");
    None
  };

  let app_state = AppState {
    db_pool: Some(db_pool.clone()),
    bookings: BookingService::new(bookings, jobs, app_config.branch_offset),
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  let served = HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await;

  // The HTTP server returns after a shutdown signal; stop the runner before the pool goes away.
  if let Some(handle) = runner {
    handle.shutdown().await;
  }
  db_pool.close().await;

  served.context("HTTP server error")?;
  tracing::info!("Bistro server stopped.");
  Ok(())
}
