// bistro_server/src/models/scheduled_job.rs

use bistro::{JobState, ScheduledJob};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

pub const JOB_COLUMNS: &str = "id, job_type, booking_id, fire_at, payload, state, locked_by, locked_at, \
                               finished_at, last_error, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, SqlxType)]
#[sqlx(type_name = "job_state", rename_all = "lowercase")]
pub enum JobStateDb {
  Pending,
  Locked,
  Done,
  Failed,
}

impl From<JobState> for JobStateDb {
  fn from(state: JobState) -> Self {
    match state {
      JobState::Pending => JobStateDb::Pending,
      JobState::Locked => JobStateDb::Locked,
      JobState::Done => JobStateDb::Done,
      JobState::Failed => JobStateDb::Failed,
    }
  }
}

impl From<JobStateDb> for JobState {
  fn from(state: JobStateDb) -> Self {
    match state {
      JobStateDb::Pending => JobState::Pending,
      JobStateDb::Locked => JobState::Locked,
      JobStateDb::Done => JobState::Done,
      JobStateDb::Failed => JobState::Failed,
    }
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct ScheduledJobRow {
  pub id: Uuid,
  pub job_type: String,
  pub booking_id: Uuid,
  pub fire_at: DateTime<Utc>,
  pub payload: Json<serde_json::Value>,
  pub state: JobStateDb,
  pub locked_by: Option<String>,
  pub locked_at: Option<DateTime<Utc>>,
  pub finished_at: Option<DateTime<Utc>>,
  pub last_error: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl From<ScheduledJobRow> for ScheduledJob {
  fn from(row: ScheduledJobRow) -> Self {
    ScheduledJob {
      id: row.id,
      job_type: row.job_type,
      booking_id: row.booking_id,
      fire_at: row.fire_at,
      payload: row.payload.0,
      state: row.state.into(),
      locked_by: row.locked_by,
      locked_at: row.locked_at,
      finished_at: row.finished_at,
      last_error: row.last_error,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}
