// bistro/src/booking/service.rs

//! The booking API: create, list and update reservations.

use chrono::FixedOffset;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::booking::model::{branch_today, Booking, BookingStatus};
use crate::booking::request::BookingRequest;
use crate::error::{BistroError, BistroResult};
use crate::jobs::model::{Enqueued, NewJob};
use crate::store::{BookingStore, JobStore};

/// Stateless request-level operations over the booking and job stores.
#[derive(Clone)]
pub struct BookingService {
  bookings: Arc<dyn BookingStore>,
  jobs: Arc<dyn JobStore>,
  branch_offset: FixedOffset,
}

impl BookingService {
  /// `branch_offset` is the UTC offset of branch wall-clock times.
  pub fn new(bookings: Arc<dyn BookingStore>, jobs: Arc<dyn JobStore>, branch_offset: FixedOffset) -> Self {
    Self {
      bookings,
      jobs,
      branch_offset,
    }
  }

  pub fn branch_offset(&self) -> FixedOffset {
    self.branch_offset
  }

  /// Validates and stores a booking, then schedules its expiry job. Nothing is
  /// written if the fire time cannot be computed.
  ///
  /// The booking is returned even if the enqueue fails; the reconciliation sweep
  /// schedules the job later.
  #[instrument(name = "BookingService::create_booking", skip_all, err(Display))]
  pub async fn create_booking(&self, request: &BookingRequest) -> BistroResult<Booking> {
    let new_booking = request.validate()?;
    let fire_at = new_booking.fire_at(self.branch_offset)?;

    let booking = self.bookings.insert(new_booking).await?;
    info!(booking_id = %booking.id, branch_id = %booking.branch_id, date = %booking.date, time = %booking.time, "Booking stored.");

    match self.jobs.enqueue(NewJob::expire_booking(booking.id, fire_at)).await {
      Ok(Enqueued::Created(job)) => {
        debug!(booking_id = %booking.id, job_id = %job.id, %fire_at, "Expiry job scheduled.");
      }
      Ok(Enqueued::Existing(job)) => {
        debug!(booking_id = %booking.id, job_id = %job.id, "Expiry job already scheduled.");
      }
      Err(e) => {
        warn!(booking_id = %booking.id, error = %e, "Failed to schedule expiry job; left to reconciliation.");
      }
    }

    Ok(booking)
  }

  /// Every booking of a user, any status, in store order.
  #[instrument(name = "BookingService::list_bookings_by_user", skip(self), err(Display))]
  pub async fn list_bookings_by_user(&self, user_id: Uuid) -> BistroResult<Vec<Booking>> {
    self.bookings.list_by_user(user_id).await
  }

  /// Bookings of a branch dated today or later, latest date first.
  #[instrument(name = "BookingService::list_upcoming_bookings_by_branch", skip(self), err(Display))]
  pub async fn list_upcoming_bookings_by_branch(&self, branch_id: Uuid) -> BistroResult<Vec<Booking>> {
    let today = branch_today(self.branch_offset);
    self.bookings.list_by_branch_from(branch_id, today).await
  }

  /// Overwrites a booking's status. Any status may be set from any other; the
  /// pending expiry job is neither cancelled nor rescheduled.
  #[instrument(name = "BookingService::update_booking_status", skip(self), err(Display))]
  pub async fn update_booking_status(&self, booking_id: Uuid, status: BookingStatus) -> BistroResult<Booking> {
    let updated = self
      .bookings
      .set_status(booking_id, status)
      .await?
      .ok_or_else(|| BistroError::not_found("Booking", booking_id))?;
    info!(%booking_id, %status, "Booking status updated.");
    Ok(updated)
  }
}
