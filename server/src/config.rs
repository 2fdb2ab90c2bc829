// bistro_server/src/config.rs

use crate::errors::{AppError, Result};
use bistro::RunnerConfig;
use chrono::FixedOffset;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  /// Run `schema.sql` against the database before serving.
  pub apply_schema: bool,

  // Job runner
  pub runner_enabled: bool,
  pub runner_id: Option<String>,
  pub job_poll_interval: Duration,
  pub job_batch_size: usize,
  pub reconcile_interval: Duration,
  pub shutdown_grace: Duration,
  pub job_lock_timeout: Duration,

  /// UTC offset of the wall-clock times customers book in.
  pub branch_offset: FixedOffset,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = parse_env("SERVER_PORT", 8080u16)?;
    let database_url = get_env("DATABASE_URL")?;
    let apply_schema = parse_env("APPLY_SCHEMA", false)?;

    let runner_enabled = parse_env("RUNNER_ENABLED", true)?;
    let runner_id = get_env("RUNNER_ID").ok().filter(|id| !id.trim().is_empty());
    let job_poll_interval = Duration::from_millis(parse_env("JOB_POLL_INTERVAL_MS", 5000u64)?);
    let job_batch_size = parse_env("JOB_BATCH_SIZE", 16usize)?;
    let reconcile_interval = Duration::from_secs(parse_env("RECONCILE_INTERVAL_SECS", 300u64)?);
    let shutdown_grace = Duration::from_secs(parse_env("SHUTDOWN_GRACE_SECS", 10u64)?);
    let job_lock_timeout = Duration::from_secs(parse_env("JOB_LOCK_TIMEOUT_SECS", 300u64)?);

    if job_poll_interval.is_zero() {
      return Err(AppError::Config("JOB_POLL_INTERVAL_MS must be greater than 0".to_string()));
    }
    if job_lock_timeout.is_zero() {
      return Err(AppError::Config("JOB_LOCK_TIMEOUT_SECS must be greater than 0".to_string()));
    }
    if job_batch_size == 0 {
      return Err(AppError::Config("JOB_BATCH_SIZE must be greater than 0".to_string()));
    }

    let offset_minutes = parse_env("BRANCH_UTC_OFFSET_MINUTES", 0i32)?;
    let branch_offset = FixedOffset::east_opt(offset_minutes * 60)
      .ok_or_else(|| AppError::Config(format!("BRANCH_UTC_OFFSET_MINUTES out of range: {}", offset_minutes)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      apply_schema,
      runner_enabled,
      runner_id,
      job_poll_interval,
      job_batch_size,
      reconcile_interval,
      shutdown_grace,
      job_lock_timeout,
      branch_offset,
    })
  }

  pub fn runner_config(&self) -> RunnerConfig {
    let defaults = RunnerConfig::default();
    RunnerConfig {
      worker_id: self.runner_id.clone().unwrap_or(defaults.worker_id),
      poll_interval: self.job_poll_interval,
      batch_size: self.job_batch_size,
      reconcile_interval: self.reconcile_interval,
      shutdown_grace: self.shutdown_grace,
      lock_timeout: self.job_lock_timeout,
    }
  }
}

/// Parses an optional variable, falling back to `default` when unset.
fn parse_env<T>(var_name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match env::var(var_name) {
    Ok(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e))),
    Err(_) => Ok(default),
  }
}
