// bistro/src/jobs/reconcile.rs

//! Sweep that gives every unresolved booking its expiry job.
//!
//! Booking insert and job enqueue are two separate writes. If the process dies
//! (or the job store fails) between them, the booking would stay `pending`
//! forever; the sweep re-enqueues the missing job. Enqueue is idempotent on
//! `(job_type, booking_id)`, so running the sweep concurrently with booking
//! creation never produces a second job.

use chrono::FixedOffset;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::BistroResult;
use crate::jobs::model::{NewJob, EXPIRE_BOOKING};
use crate::store::{BookingStore, JobStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
  pub scanned: usize,
  pub enqueued: usize,
  pub skipped: usize,
}

#[derive(Clone)]
pub struct Reconciler {
  bookings: Arc<dyn BookingStore>,
  jobs: Arc<dyn JobStore>,
  branch_offset: FixedOffset,
}

impl Reconciler {
  pub fn new(bookings: Arc<dyn BookingStore>, jobs: Arc<dyn JobStore>, branch_offset: FixedOffset) -> Self {
    Self {
      bookings,
      jobs,
      branch_offset,
    }
  }

  #[instrument(name = "Reconciler::sweep", skip(self), err(Display))]
  pub async fn sweep(&self) -> BistroResult<SweepReport> {
    let unresolved = self.bookings.list_unresolved().await?;
    let mut report = SweepReport {
      scanned: unresolved.len(),
      ..SweepReport::default()
    };

    for booking in unresolved {
      if self.jobs.find_for_booking(EXPIRE_BOOKING, booking.id).await?.is_some() {
        continue;
      }
      let fire_at = match booking.fire_at(self.branch_offset) {
        Ok(at) => at,
        Err(e) => {
          warn!(booking_id = %booking.id, error = %e, "Cannot compute fire time, skipping booking.");
          report.skipped += 1;
          continue;
        }
      };
      if self
        .jobs
        .enqueue(NewJob::expire_booking(booking.id, fire_at))
        .await?
        .is_created()
      {
        info!(booking_id = %booking.id, %fire_at, "Enqueued missing expiry job.");
        report.enqueued += 1;
      }
    }

    debug!(?report, "Reconciliation sweep finished.");
    Ok(report)
  }
}
