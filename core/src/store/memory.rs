// bistro/src/store/memory.rs

//! In-process stores backed by `parking_lot::RwLock`.
//!
//! Lock guards are never held across `.await` points; every trait method takes
//! the lock, does its work synchronously and releases it before returning.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::booking::model::{Booking, BookingStatus, NewBooking};
use crate::error::{BistroError, BistroResult};
use crate::jobs::model::{Enqueued, JobState, NewJob, ScheduledJob};
use crate::store::{BookingStore, JobStore};

#[derive(Debug, Default)]
struct BookingTable {
  rows: Vec<Booking>,
  index: HashMap<Uuid, usize>,
}

impl BookingTable {
  fn get_mut(&mut self, id: Uuid) -> Option<&mut Booking> {
    let pos = *self.index.get(&id)?;
    self.rows.get_mut(pos)
  }
}

#[derive(Debug, Default)]
pub struct MemoryBookingStore {
  table: RwLock<BookingTable>,
}

impl MemoryBookingStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Copy of every stored booking, in insertion order.
  pub fn snapshot(&self) -> Vec<Booking> {
    self.table.read().rows.clone()
  }

  pub fn len(&self) -> usize {
    self.table.read().rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Removes a booking. Pending expiry jobs are left in place.
  pub fn remove(&self, id: Uuid) -> Option<Booking> {
    let mut table = self.table.write();
    let pos = table.index.remove(&id)?;
    let removed = table.rows.remove(pos);
    for idx in table.index.values_mut() {
      if *idx > pos {
        *idx -= 1;
      }
    }
    Some(removed)
  }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
  async fn insert(&self, booking: NewBooking) -> BistroResult<Booking> {
    let stored = booking.into_booking(Uuid::new_v4(), Utc::now());
    let mut table = self.table.write();
    let pos = table.rows.len();
    table.index.insert(stored.id, pos);
    table.rows.push(stored.clone());
    Ok(stored)
  }

  async fn find_by_id(&self, id: Uuid) -> BistroResult<Option<Booking>> {
    let table = self.table.read();
    Ok(table.index.get(&id).and_then(|pos| table.rows.get(*pos)).cloned())
  }

  async fn list_by_user(&self, user_id: Uuid) -> BistroResult<Vec<Booking>> {
    let table = self.table.read();
    Ok(table.rows.iter().filter(|b| b.user_id == user_id).cloned().collect())
  }

  async fn list_by_branch_from(&self, branch_id: Uuid, from: NaiveDate) -> BistroResult<Vec<Booking>> {
    let mut found: Vec<Booking> = {
      let table = self.table.read();
      table
        .rows
        .iter()
        .filter(|b| b.branch_id == branch_id && b.date >= from)
        .cloned()
        .collect()
    };
    // Stable sort keeps insertion order among bookings of the same date.
    found.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(found)
  }

  async fn set_status(&self, id: Uuid, status: BookingStatus) -> BistroResult<Option<Booking>> {
    let mut table = self.table.write();
    Ok(table.get_mut(id).map(|booking| {
      booking.status = status;
      booking.updated_at = Utc::now();
      booking.clone()
    }))
  }

  async fn set_status_if(
    &self,
    id: Uuid,
    expected: BookingStatus,
    status: BookingStatus,
  ) -> BistroResult<Option<Booking>> {
    let mut table = self.table.write();
    match table.get_mut(id) {
      Some(booking) if booking.status == expected => {
        booking.status = status;
        booking.updated_at = Utc::now();
        Ok(Some(booking.clone()))
      }
      _ => Ok(None),
    }
  }

  async fn list_unresolved(&self) -> BistroResult<Vec<Booking>> {
    let table = self.table.read();
    Ok(
      table
        .rows
        .iter()
        .filter(|b| matches!(b.status, BookingStatus::Pending | BookingStatus::Approved))
        .cloned()
        .collect(),
    )
  }
}

#[derive(Debug, Default)]
struct JobTable {
  jobs: HashMap<Uuid, ScheduledJob>,
  by_key: HashMap<(String, Uuid), Uuid>,
}

#[derive(Debug, Default)]
pub struct MemoryJobStore {
  table: RwLock<JobTable>,
}

impl MemoryJobStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Copy of every stored job, ordered by `fire_at`.
  pub fn snapshot(&self) -> Vec<ScheduledJob> {
    let mut jobs: Vec<ScheduledJob> = self.table.read().jobs.values().cloned().collect();
    jobs.sort_by_key(|j| (j.fire_at, j.created_at));
    jobs
  }

  pub fn len(&self) -> usize {
    self.table.read().jobs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn finish(&self, id: Uuid, state: JobState, error: Option<&str>, now: DateTime<Utc>) -> BistroResult<()> {
    let mut table = self.table.write();
    let job = table
      .jobs
      .get_mut(&id)
      .ok_or_else(|| BistroError::not_found("Scheduled job", id))?;
    job.state = state;
    job.last_error = error.map(str::to_string);
    job.finished_at = Some(now);
    job.updated_at = now;
    Ok(())
  }
}

#[async_trait]
impl JobStore for MemoryJobStore {
  async fn enqueue(&self, job: NewJob) -> BistroResult<Enqueued> {
    let mut table = self.table.write();
    let key = (job.job_type.clone(), job.booking_id);
    if let Some(existing) = table.by_key.get(&key).and_then(|id| table.jobs.get(id)) {
      return Ok(Enqueued::Existing(existing.clone()));
    }
    let stored = job.into_job(Uuid::new_v4(), Utc::now());
    table.by_key.insert(key, stored.id);
    table.jobs.insert(stored.id, stored.clone());
    Ok(Enqueued::Created(stored))
  }

  async fn find_by_id(&self, id: Uuid) -> BistroResult<Option<ScheduledJob>> {
    Ok(self.table.read().jobs.get(&id).cloned())
  }

  async fn find_for_booking(&self, job_type: &str, booking_id: Uuid) -> BistroResult<Option<ScheduledJob>> {
    let table = self.table.read();
    Ok(
      table
        .by_key
        .get(&(job_type.to_string(), booking_id))
        .and_then(|id| table.jobs.get(id))
        .cloned(),
    )
  }

  async fn due(&self, now: DateTime<Utc>, stale_before: DateTime<Utc>, limit: usize) -> BistroResult<Vec<ScheduledJob>> {
    let mut due: Vec<ScheduledJob> = {
      let table = self.table.read();
      table
        .jobs
        .values()
        .filter(|j| (j.state == JobState::Pending && j.fire_at <= now) || is_stale(j, stale_before))
        .cloned()
        .collect()
    };
    due.sort_by_key(|j| (j.fire_at, j.created_at));
    due.truncate(limit);
    Ok(due)
  }

  async fn claim(
    &self,
    id: Uuid,
    worker_id: &str,
    now: DateTime<Utc>,
    stale_before: DateTime<Utc>,
  ) -> BistroResult<Option<ScheduledJob>> {
    let mut table = self.table.write();
    match table.jobs.get_mut(&id) {
      Some(job) if job.state == JobState::Pending || is_stale(&*job, stale_before) => {
        job.state = JobState::Locked;
        job.locked_by = Some(worker_id.to_string());
        job.locked_at = Some(now);
        job.updated_at = now;
        Ok(Some(job.clone()))
      }
      _ => Ok(None),
    }
  }

  async fn mark_done(&self, id: Uuid, now: DateTime<Utc>) -> BistroResult<()> {
    self.finish(id, JobState::Done, None, now)
  }

  async fn mark_failed(&self, id: Uuid, error: &str, now: DateTime<Utc>) -> BistroResult<()> {
    self.finish(id, JobState::Failed, Some(error), now)
  }
}

/// A lock whose holder never recorded an outcome.
fn is_stale(job: &ScheduledJob, stale_before: DateTime<Utc>) -> bool {
  job.state == JobState::Locked && job.locked_at.is_some_and(|at| at < stale_before)
}
