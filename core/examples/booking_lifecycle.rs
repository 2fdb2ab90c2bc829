// bistro/examples/booking_lifecycle.rs

use bistro::{
  BistroError, BookingRequest, BookingService, BookingStatus, ExpiryHandler, JobRegistry, JobRunner,
  MemoryBookingStore, MemoryJobStore, Reconciler, RunnerConfig, EXPIRE_BOOKING,
};
use chrono::{FixedOffset, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

fn request(name: &str, date: &str, time: &str, branch_id: Uuid) -> BookingRequest {
  BookingRequest {
    name: Some(name.to_string()),
    phone: Some("5551234567".to_string()),
    seats: Some("2".to_string()),
    date: Some(date.to_string()),
    time: Some(time.to_string()),
    user_id: Some(Uuid::new_v4().to_string()),
    branch_id: Some(branch_id.to_string()),
  }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Bistro Booking Lifecycle Example ---");

  // 1. Stores and the booking API. Branch wall-clock times are UTC here.
  let offset = FixedOffset::east_opt(0).ok_or("invalid offset")?;
  let bookings = Arc::new(MemoryBookingStore::new());
  let jobs = Arc::new(MemoryJobStore::new());
  let service = BookingService::new(bookings.clone(), jobs.clone(), offset);

  // 2. Register the expiry handler and start a runner with a short poll interval.
  let registry = Arc::new(JobRegistry::new());
  registry.register(EXPIRE_BOOKING, Arc::new(ExpiryHandler::new(bookings.clone())));
  let config = RunnerConfig {
    poll_interval: Duration::from_millis(100),
    ..RunnerConfig::default()
  };
  let handle = JobRunner::new(jobs.clone(), registry, config)
    .with_reconciler(Reconciler::new(bookings.clone(), jobs.clone(), offset))
    .start();

  // 3. Yesterday's bookings are due immediately; next week's is not.
  let branch = Uuid::new_v4();
  let yesterday = (Utc::now().date_naive() - TimeDelta::days(1)).format("%Y-%m-%d").to_string();
  let next_week = (Utc::now().date_naive() + TimeDelta::days(7)).format("%Y-%m-%d").to_string();

  let forgotten = service.create_booking(&request("Forgotten", &yesterday, "19:00", branch)).await?;
  let confirmed = service.create_booking(&request("Confirmed", &yesterday, "20:00", branch)).await?;
  service.update_booking_status(confirmed.id, BookingStatus::Approved).await?;
  let upcoming = service.create_booking(&request("Upcoming", &next_week, "20:00", branch)).await?;

  // 4. A request with problems is rejected as a whole.
  let mut broken = request("", &next_week, "8pm", branch);
  broken.seats = Some("0".to_string());
  match service.create_booking(&broken).await {
    Err(BistroError::Validation { problems }) => info!(?problems, "Rejected booking request."),
    other => info!(?other, "Unexpected outcome for a broken request."),
  }

  tokio::time::sleep(Duration::from_millis(500)).await;
  handle.shutdown().await;

  // 5. Report the final statuses.
  for booking in bookings.snapshot() {
    info!(name = %booking.name, date = %booking.date, status = %booking.status, "Final booking state.");
  }
  for job in jobs.snapshot() {
    info!(booking_id = %job.booking_id, state = %job.state, fire_at = %job.fire_at, "Final job state.");
  }

  let upcoming_for_branch = service.list_upcoming_bookings_by_branch(branch).await?;
  info!(
    count = upcoming_for_branch.len(),
    first = ?upcoming_for_branch.first().map(|b| b.id == upcoming.id),
    "Upcoming bookings for branch."
  );
  info!(forgotten = %forgotten.id, confirmed = %confirmed.id, "--- Example finished ---");
  Ok(())
}
