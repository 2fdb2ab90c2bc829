// bistro_server/src/db/job_store.rs

use async_trait::async_trait;
use bistro::{BistroError, BistroResult, Enqueued, JobState, JobStore, NewJob, ScheduledJob};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::scheduled_job::JOB_COLUMNS;
use crate::models::{JobStateDb, ScheduledJobRow};

#[derive(Debug, Clone)]
pub struct PgJobStore {
  pool: PgPool,
}

impl PgJobStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn finish(&self, id: Uuid, state: JobState, error: Option<&str>, now: DateTime<Utc>) -> BistroResult<()> {
    let result = sqlx::query(
      "UPDATE scheduled_jobs SET state = $2, last_error = $3, finished_at = $4, updated_at = $4 WHERE id = $1",
    )
    .bind(id)
    .bind(JobStateDb::from(state))
    .bind(error)
    .bind(now)
    .execute(&self.pool)
    .await
    .map_err(BistroError::persistence)?;

    if result.rows_affected() == 0 {
      return Err(BistroError::not_found("Scheduled job", id));
    }
    Ok(())
  }
}

#[async_trait]
impl JobStore for PgJobStore {
  #[instrument(name = "PgJobStore::enqueue", skip_all, fields(job_type = %job.job_type, booking_id = %job.booking_id), err(Display))]
  async fn enqueue(&self, job: NewJob) -> BistroResult<Enqueued> {
    let job_type = job.job_type.clone();
    let booking_id = job.booking_id;
    let job = job.into_job(Uuid::new_v4(), Utc::now());

    // The unique (job_type, booking_id) constraint makes a repeated enqueue a no-op.
    let sql = format!(
      "INSERT INTO scheduled_jobs (id, job_type, booking_id, fire_at, payload, state, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
       ON CONFLICT (job_type, booking_id) DO NOTHING \
       RETURNING {JOB_COLUMNS}"
    );
    let inserted: Option<ScheduledJobRow> = sqlx::query_as(&sql)
      .bind(job.id)
      .bind(&job.job_type)
      .bind(job.booking_id)
      .bind(job.fire_at)
      .bind(Json(&job.payload))
      .bind(JobStateDb::from(job.state))
      .bind(job.created_at)
      .fetch_optional(&self.pool)
      .await
      .map_err(BistroError::persistence)?;

    if let Some(row) = inserted {
      return Ok(Enqueued::Created(row.into()));
    }

    debug!("Job already exists for this booking.");
    let existing = self.find_for_booking(&job_type, booking_id).await?.ok_or_else(|| {
      BistroError::Internal(format!(
        "Enqueue conflicted on ({}, {}) but no job was found",
        job_type, booking_id
      ))
    })?;
    Ok(Enqueued::Existing(existing))
  }

  async fn find_by_id(&self, id: Uuid) -> BistroResult<Option<ScheduledJob>> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM scheduled_jobs WHERE id = $1");
    let row: Option<ScheduledJobRow> = sqlx::query_as(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(BistroError::persistence)?;
    Ok(row.map(ScheduledJob::from))
  }

  async fn find_for_booking(&self, job_type: &str, booking_id: Uuid) -> BistroResult<Option<ScheduledJob>> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM scheduled_jobs WHERE job_type = $1 AND booking_id = $2");
    let row: Option<ScheduledJobRow> = sqlx::query_as(&sql)
      .bind(job_type)
      .bind(booking_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(BistroError::persistence)?;
    Ok(row.map(ScheduledJob::from))
  }

  async fn due(&self, now: DateTime<Utc>, stale_before: DateTime<Utc>, limit: usize) -> BistroResult<Vec<ScheduledJob>> {
    let sql = format!(
      "SELECT {JOB_COLUMNS} FROM scheduled_jobs \
       WHERE (state = 'pending' AND fire_at <= $1) OR (state = 'locked' AND locked_at < $2) \
       ORDER BY fire_at, created_at LIMIT $3"
    );
    let rows: Vec<ScheduledJobRow> = sqlx::query_as(&sql)
      .bind(now)
      .bind(stale_before)
      .bind(i64::try_from(limit).unwrap_or(i64::MAX))
      .fetch_all(&self.pool)
      .await
      .map_err(BistroError::persistence)?;
    Ok(rows.into_iter().map(ScheduledJob::from).collect())
  }

  /// Conditional update: only one runner can take a given pending or stale job.
  #[instrument(name = "PgJobStore::claim", skip(self), err(Display))]
  async fn claim(
    &self,
    id: Uuid,
    worker_id: &str,
    now: DateTime<Utc>,
    stale_before: DateTime<Utc>,
  ) -> BistroResult<Option<ScheduledJob>> {
    let sql = format!(
      "UPDATE scheduled_jobs SET state = 'locked', locked_by = $2, locked_at = $3, updated_at = $3 \
       WHERE id = $1 AND (state = 'pending' OR (state = 'locked' AND locked_at < $4)) \
       RETURNING {JOB_COLUMNS}"
    );
    let row: Option<ScheduledJobRow> = sqlx::query_as(&sql)
      .bind(id)
      .bind(worker_id)
      .bind(now)
      .bind(stale_before)
      .fetch_optional(&self.pool)
      .await
      .map_err(BistroError::persistence)?;
    Ok(row.map(ScheduledJob::from))
  }

  async fn mark_done(&self, id: Uuid, now: DateTime<Utc>) -> BistroResult<()> {
    self.finish(id, JobState::Done, None, now).await
  }

  async fn mark_failed(&self, id: Uuid, error: &str, now: DateTime<Utc>) -> BistroResult<()> {
    self.finish(id, JobState::Failed, Some(error), now).await
  }
}

/// These run against a live database: `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
  use super::*;
  use bistro::EXPIRE_BOOKING;
  use chrono::TimeDelta;

  async fn store() -> Option<PgJobStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPool::connect(&url).await.expect("connect to DATABASE_URL");
    crate::db::apply_schema(&pool).await.expect("apply schema");
    Some(PgJobStore::new(pool))
  }

  #[actix_web::test]
  #[ignore = "needs DATABASE_URL"]
  async fn test_enqueue_is_idempotent_per_booking() {
    let Some(store) = store().await else { return };
    let booking_id = Uuid::new_v4();
    let fire_at = Utc::now() - TimeDelta::minutes(1);

    let first = store.enqueue(NewJob::expire_booking(booking_id, fire_at)).await.unwrap();
    let second = store
      .enqueue(NewJob::expire_booking(booking_id, fire_at + TimeDelta::hours(1)))
      .await
      .unwrap();

    assert!(first.is_created());
    assert!(!second.is_created());
    assert_eq!(first.job().id, second.job().id);
    let stored = store.find_for_booking(EXPIRE_BOOKING, booking_id).await.unwrap().unwrap();
    assert_eq!(stored.id, first.job().id);
    assert_eq!(stored.state, JobState::Pending);
    assert_eq!(stored.payload, first.job().payload);
  }

  #[actix_web::test]
  #[ignore = "needs DATABASE_URL"]
  async fn test_claim_has_one_winner_until_the_lock_goes_stale() {
    let Some(store) = store().await else { return };
    let job = store
      .enqueue(NewJob::expire_booking(Uuid::new_v4(), Utc::now() - TimeDelta::minutes(1)))
      .await
      .unwrap()
      .job()
      .clone();
    let locked_at = Utc::now() - TimeDelta::minutes(10);
    let fresh_cutoff = locked_at - TimeDelta::minutes(1);

    let won = store.claim(job.id, "worker-a", locked_at, fresh_cutoff).await.unwrap().unwrap();
    let lost = store.claim(job.id, "worker-b", Utc::now(), fresh_cutoff).await.unwrap();

    assert_eq!(won.state, JobState::Locked);
    assert_eq!(won.locked_by.as_deref(), Some("worker-a"));
    assert!(lost.is_none());
    let due = store.due(Utc::now(), fresh_cutoff, 1000).await.unwrap();
    assert!(due.iter().all(|j| j.id != job.id));

    let stale_cutoff = Utc::now() - TimeDelta::minutes(5);
    let due = store.due(Utc::now(), stale_cutoff, 1000).await.unwrap();
    assert!(due.iter().any(|j| j.id == job.id));
    let reclaimed = store.claim(job.id, "worker-b", Utc::now(), stale_cutoff).await.unwrap().unwrap();
    assert_eq!(reclaimed.locked_by.as_deref(), Some("worker-b"));
    assert!(store.claim(job.id, "worker-c", Utc::now(), stale_cutoff).await.unwrap().is_none());
  }

  #[actix_web::test]
  #[ignore = "needs DATABASE_URL"]
  async fn test_finished_jobs_record_outcome_and_are_never_due() {
    let Some(store) = store().await else { return };
    let past = Utc::now() - TimeDelta::minutes(1);
    let done = store.enqueue(NewJob::expire_booking(Uuid::new_v4(), past)).await.unwrap().job().clone();
    let failed = store.enqueue(NewJob::expire_booking(Uuid::new_v4(), past)).await.unwrap().job().clone();
    let cutoff = Utc::now() + TimeDelta::hours(1);
    store.claim(done.id, "worker-a", past, cutoff).await.unwrap().unwrap();
    store.claim(failed.id, "worker-a", past, cutoff).await.unwrap().unwrap();

    store.mark_done(done.id, Utc::now()).await.unwrap();
    store.mark_failed(failed.id, "handler exploded", Utc::now()).await.unwrap();

    let done = store.find_by_id(done.id).await.unwrap().unwrap();
    let failed = store.find_by_id(failed.id).await.unwrap().unwrap();
    assert_eq!(done.state, JobState::Done);
    assert!(done.finished_at.is_some());
    assert_eq!(failed.state, JobState::Failed);
    assert_eq!(failed.last_error.as_deref(), Some("handler exploded"));
    let due = store.due(Utc::now(), cutoff, 1000).await.unwrap();
    assert!(due.iter().all(|j| j.id != done.id && j.id != failed.id));
    let missing = store.mark_done(Uuid::new_v4(), Utc::now()).await.unwrap_err();
    assert!(matches!(missing, BistroError::NotFound { .. }));
  }
}
