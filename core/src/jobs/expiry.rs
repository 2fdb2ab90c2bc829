// bistro/src/jobs/expiry.rs

//! The `expire booking` job: resolves a booking once its reservation time passes.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::booking::model::BookingStatus;
use crate::error::{BistroError, BistroResult};
use crate::jobs::model::{ExpiryPayload, ScheduledJob};
use crate::jobs::registry::JobHandler;
use crate::store::BookingStore;

/// Conditional-write attempts before giving up on a booking whose status keeps
/// changing underneath the handler.
const MAX_ATTEMPTS: usize = 3;

/// What the expiry handler did to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
  /// The booking no longer exists.
  Missing,
  /// The booking was already terminal.
  Unchanged(BookingStatus),
  Transitioned { from: BookingStatus, to: BookingStatus },
}

/// Status a booking moves to when its reservation time is reached.
/// Terminal statuses are left as they are, which keeps repeated firings idempotent.
pub fn resolve_expiry(current: BookingStatus) -> Option<BookingStatus> {
  match current {
    BookingStatus::Approved => Some(BookingStatus::Completed),
    BookingStatus::Pending => Some(BookingStatus::Expired),
    BookingStatus::Refused | BookingStatus::Expired | BookingStatus::Completed => None,
  }
}

#[derive(Clone)]
pub struct ExpiryHandler {
  bookings: Arc<dyn BookingStore>,
}

impl ExpiryHandler {
  pub fn new(bookings: Arc<dyn BookingStore>) -> Self {
    Self { bookings }
  }

  #[instrument(name = "ExpiryHandler::expire", skip(self), err(Display))]
  pub async fn expire(&self, booking_id: Uuid) -> BistroResult<ExpiryOutcome> {
    for _ in 0..MAX_ATTEMPTS {
      let Some(booking) = self.bookings.find_by_id(booking_id).await? else {
        warn!(%booking_id, "Booking not found, nothing to expire.");
        return Ok(ExpiryOutcome::Missing);
      };

      let Some(next) = resolve_expiry(booking.status) else {
        info!(%booking_id, status = %booking.status, "Booking already resolved, leaving as is.");
        return Ok(ExpiryOutcome::Unchanged(booking.status));
      };

      // Guarded by the observed status so a concurrent approval is not overwritten.
      if self
        .bookings
        .set_status_if(booking_id, booking.status, next)
        .await?
        .is_some()
      {
        info!(%booking_id, from = %booking.status, to = %next, "Booking resolved at reservation time.");
        return Ok(ExpiryOutcome::Transitioned {
          from: booking.status,
          to: next,
        });
      }
      warn!(%booking_id, "Booking status changed during expiry, re-evaluating.");
    }

    Err(BistroError::Internal(format!(
      "Booking {} kept changing status during expiry",
      booking_id
    )))
  }
}

#[async_trait]
impl JobHandler for ExpiryHandler {
  async fn handle(&self, job: &ScheduledJob) -> BistroResult<()> {
    let payload: ExpiryPayload =
      serde_json::from_value(job.payload.clone()).map_err(|e| BistroError::Payload {
        job_type: job.job_type.clone(),
        source: e.into(),
      })?;
    self.expire(payload.booking_id).await.map(|_| ())
  }
}
