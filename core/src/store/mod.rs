// bistro/src/store/mod.rs

//! Persistence contracts for bookings and scheduled jobs.
//!
//! Implementations must make each single-record write atomic. `JobStore::claim`
//! is the only cross-runner mutual-exclusion point and must be a conditional
//! write guarded by the current state.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::booking::model::{Booking, BookingStatus, NewBooking};
use crate::error::BistroResult;
use crate::jobs::model::{Enqueued, NewJob, ScheduledJob};

pub mod memory;

#[async_trait]
pub trait BookingStore: Send + Sync {
  /// Persists a new booking with status `pending`, assigning id and timestamps.
  async fn insert(&self, booking: NewBooking) -> BistroResult<Booking>;

  async fn find_by_id(&self, id: Uuid) -> BistroResult<Option<Booking>>;

  /// All bookings of a user, in insertion order.
  async fn list_by_user(&self, user_id: Uuid) -> BistroResult<Vec<Booking>>;

  /// Bookings of a branch dated on or after `from`, latest date first.
  async fn list_by_branch_from(&self, branch_id: Uuid, from: NaiveDate) -> BistroResult<Vec<Booking>>;

  /// Overwrites the status. `None` if the booking does not exist.
  async fn set_status(&self, id: Uuid, status: BookingStatus) -> BistroResult<Option<Booking>>;

  /// Sets `status` only if the booking currently has status `expected`.
  /// `None` if the booking is missing or its status differs.
  async fn set_status_if(
    &self,
    id: Uuid,
    expected: BookingStatus,
    status: BookingStatus,
  ) -> BistroResult<Option<Booking>>;

  /// Bookings still waiting for resolution (`pending` or `approved`).
  async fn list_unresolved(&self) -> BistroResult<Vec<Booking>>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
  /// Inserts the job unless one with the same `(job_type, booking_id)` exists.
  async fn enqueue(&self, job: NewJob) -> BistroResult<Enqueued>;

  async fn find_by_id(&self, id: Uuid) -> BistroResult<Option<ScheduledJob>>;

  async fn find_for_booking(&self, job_type: &str, booking_id: Uuid) -> BistroResult<Option<ScheduledJob>>;

  /// Claimable jobs, oldest `fire_at` first, at most `limit`: pending jobs with
  /// `fire_at <= now`, plus stale jobs still `locked` since before `stale_before`.
  async fn due(&self, now: DateTime<Utc>, stale_before: DateTime<Utc>, limit: usize)
    -> BistroResult<Vec<ScheduledJob>>;

  /// Atomically moves a job to `locked` if it is `pending`, or `locked` with
  /// `locked_at < stale_before`. Returns the claimed job, or `None` if another
  /// runner holds a fresh lock, it finished or it is missing.
  async fn claim(
    &self,
    id: Uuid,
    worker_id: &str,
    now: DateTime<Utc>,
    stale_before: DateTime<Utc>,
  ) -> BistroResult<Option<ScheduledJob>>;

  async fn mark_done(&self, id: Uuid, now: DateTime<Utc>) -> BistroResult<()>;

  async fn mark_failed(&self, id: Uuid, error: &str, now: DateTime<Utc>) -> BistroResult<()>;
}
