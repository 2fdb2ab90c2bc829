// bistro/src/jobs/model.rs

//! Scheduled job records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Job type resolving a booking once its reservation time is reached.
pub const EXPIRE_BOOKING: &str = "expire booking";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
  /// Waiting for `fire_at`.
  Pending,
  /// Claimed by a runner, handler in progress.
  Locked,
  Done,
  Failed,
}

impl JobState {
  pub fn as_str(&self) -> &'static str {
    match self {
      JobState::Pending => "pending",
      JobState::Locked => "locked",
      JobState::Done => "done",
      JobState::Failed => "failed",
    }
  }
}

impl fmt::Display for JobState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
  pub id: Uuid,
  pub job_type: String,
  /// Together with `job_type`, the idempotency key of the job.
  pub booking_id: Uuid,
  pub fire_at: DateTime<Utc>,
  pub payload: serde_json::Value,
  pub state: JobState,
  pub locked_by: Option<String>,
  pub locked_at: Option<DateTime<Utc>>,
  pub finished_at: Option<DateTime<Utc>>,
  pub last_error: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A job to be enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
  pub job_type: String,
  pub booking_id: Uuid,
  pub fire_at: DateTime<Utc>,
  pub payload: serde_json::Value,
}

impl NewJob {
  pub fn expire_booking(booking_id: Uuid, fire_at: DateTime<Utc>) -> Self {
    NewJob {
      job_type: EXPIRE_BOOKING.to_string(),
      booking_id,
      fire_at,
      payload: serde_json::json!({ "bookingId": booking_id }),
    }
  }

  pub fn into_job(self, id: Uuid, now: DateTime<Utc>) -> ScheduledJob {
    ScheduledJob {
      id,
      job_type: self.job_type,
      booking_id: self.booking_id,
      fire_at: self.fire_at,
      payload: self.payload,
      state: JobState::Pending,
      locked_by: None,
      locked_at: None,
      finished_at: None,
      last_error: None,
      created_at: now,
      updated_at: now,
    }
  }
}

/// Payload of an `EXPIRE_BOOKING` job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryPayload {
  pub booking_id: Uuid,
}

/// Result of an idempotent enqueue.
#[derive(Debug, Clone, PartialEq)]
pub enum Enqueued {
  Created(ScheduledJob),
  /// A job with the same `(job_type, booking_id)` already existed; it is returned unchanged.
  Existing(ScheduledJob),
}

impl Enqueued {
  pub fn job(&self) -> &ScheduledJob {
    match self {
      Enqueued::Created(job) | Enqueued::Existing(job) => job,
    }
  }

  pub fn is_created(&self) -> bool {
    matches!(self, Enqueued::Created(_))
  }
}
