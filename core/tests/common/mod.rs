// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use bistro::{
  BistroError, BistroResult, BookingRequest, BookingService, Enqueued, ExpiryHandler, JobRegistry, JobStore,
  MemoryBookingStore, MemoryJobStore, NewJob, ScheduledJob, EXPIRE_BOOKING,
};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, Utc};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

// --- Fixtures ---

pub fn utc() -> FixedOffset {
  FixedOffset::east_opt(0).unwrap()
}

pub fn days_from_today(days: i64) -> NaiveDate {
  Utc::now().date_naive() + TimeDelta::days(days)
}

/// A `stale_before` under which no lock is ever stale.
pub fn no_stale_locks() -> DateTime<Utc> {
  DateTime::<Utc>::MIN_UTC
}

/// A fully valid request for the given user/branch, date and time.
pub fn booking_request(user_id: Uuid, branch_id: Uuid, date: &str, time: &str) -> BookingRequest {
  BookingRequest {
    name: Some("Ada Lovelace".to_string()),
    phone: Some("5551234567".to_string()),
    seats: Some("4".to_string()),
    date: Some(date.to_string()),
    time: Some(time.to_string()),
    user_id: Some(user_id.to_string()),
    branch_id: Some(branch_id.to_string()),
  }
}

/// In-memory stores, the booking API and a registry with the expiry handler.
pub struct Harness {
  pub bookings: Arc<MemoryBookingStore>,
  pub jobs: Arc<MemoryJobStore>,
  pub service: BookingService,
  pub registry: Arc<JobRegistry>,
}

impl Harness {
  pub fn new() -> Self {
    let bookings = Arc::new(MemoryBookingStore::new());
    let jobs = Arc::new(MemoryJobStore::new());
    let service = BookingService::new(bookings.clone(), jobs.clone(), utc());
    let registry = Arc::new(JobRegistry::new());
    registry.register(EXPIRE_BOOKING, Arc::new(ExpiryHandler::new(bookings.clone())));
    Self {
      bookings,
      jobs,
      service,
      registry,
    }
  }

  pub fn expiry_handler(&self) -> ExpiryHandler {
    ExpiryHandler::new(self.bookings.clone())
  }
}

// --- Job store whose enqueue always fails ---

pub struct FailingEnqueueStore {
  pub inner: MemoryJobStore,
}

#[async_trait]
impl JobStore for FailingEnqueueStore {
  async fn enqueue(&self, _job: NewJob) -> BistroResult<Enqueued> {
    Err(BistroError::Internal("job store unavailable".to_string()))
  }

  async fn find_by_id(&self, id: Uuid) -> BistroResult<Option<ScheduledJob>> {
    self.inner.find_by_id(id).await
  }

  async fn find_for_booking(&self, job_type: &str, booking_id: Uuid) -> BistroResult<Option<ScheduledJob>> {
    self.inner.find_for_booking(job_type, booking_id).await
  }

  async fn due(&self, now: DateTime<Utc>, stale_before: DateTime<Utc>, limit: usize) -> BistroResult<Vec<ScheduledJob>> {
    self.inner.due(now, stale_before, limit).await
  }

  async fn claim(
    &self,
    id: Uuid,
    worker_id: &str,
    now: DateTime<Utc>,
    stale_before: DateTime<Utc>,
  ) -> BistroResult<Option<ScheduledJob>> {
    self.inner.claim(id, worker_id, now, stale_before).await
  }

  async fn mark_done(&self, id: Uuid, now: DateTime<Utc>) -> BistroResult<()> {
    self.inner.mark_done(id, now).await
  }

  async fn mark_failed(&self, id: Uuid, error: &str, now: DateTime<Utc>) -> BistroResult<()> {
    self.inner.mark_failed(id, error, now).await
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
