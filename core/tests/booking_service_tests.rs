// tests/booking_service_tests.rs
mod common;

use bistro::{
  combine, BistroError, BookingRequest, BookingService, BookingStatus, BookingStore, JobState, JobStore,
  MemoryBookingStore, MemoryJobStore, EXPIRE_BOOKING,
};
use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use common::*;
use serial_test::serial;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
#[serial]
async fn test_create_booking_stores_pending_booking_and_one_expiry_job() {
  setup_tracing();
  let h = Harness::new();
  let (user, branch) = (Uuid::new_v4(), Uuid::new_v4());

  let booking = h
    .service
    .create_booking(&booking_request(user, branch, "2031-05-17", "19:30"))
    .await
    .expect("valid booking is accepted");

  assert_eq!(booking.status, BookingStatus::Pending);
  assert_eq!(booking.name, "Ada Lovelace");
  assert_eq!(booking.phone, 5551234567);
  assert_eq!(booking.seats, 4);
  assert_eq!(booking.user_id, user);
  assert_eq!(booking.branch_id, branch);
  assert_eq!(booking.date, NaiveDate::from_ymd_opt(2031, 5, 17).unwrap());
  assert_eq!(booking.time, "19:30");

  let jobs = h.jobs.snapshot();
  assert_eq!(jobs.len(), 1);
  let job = &jobs[0];
  assert_eq!(job.job_type, EXPIRE_BOOKING);
  assert_eq!(job.booking_id, booking.id);
  assert_eq!(job.payload["bookingId"], booking.id.to_string());
  assert_eq!(job.state, JobState::Pending);
  assert_eq!(job.fire_at, Utc.with_ymd_and_hms(2031, 5, 17, 19, 30, 0).unwrap());
}

#[tokio::test]
#[serial]
async fn test_fire_time_honours_branch_offset() {
  setup_tracing();
  let bookings = Arc::new(MemoryBookingStore::new());
  let jobs = Arc::new(MemoryJobStore::new());
  let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
  let service = BookingService::new(bookings.clone(), jobs.clone(), plus_two);

  let booking = service
    .create_booking(&booking_request(Uuid::new_v4(), Uuid::new_v4(), "2031-01-01", "01:15"))
    .await
    .unwrap();

  let job = jobs.find_for_booking(EXPIRE_BOOKING, booking.id).await.unwrap().unwrap();
  assert_eq!(job.fire_at, Utc.with_ymd_and_hms(2030, 12, 31, 23, 15, 0).unwrap());
  assert_eq!(
    combine(
      booking.date,
      NaiveTime::from_hms_opt(1, 15, 0).unwrap(),
      plus_two
    )
    .unwrap(),
    job.fire_at
  );
}

#[tokio::test]
#[serial]
async fn test_missing_field_fails_validation_without_side_effects() {
  setup_tracing();
  let h = Harness::new();
  let mut request = booking_request(Uuid::new_v4(), Uuid::new_v4(), "2031-05-17", "19:30");
  request.name = Some("   ".to_string());

  let result = h.service.create_booking(&request).await;

  match result {
    Err(BistroError::Validation { problems }) => {
      assert_eq!(problems, vec!["name is required".to_string()]);
    }
    other => panic!("Expected Validation error, got {:?}", other),
  }
  assert!(h.bookings.is_empty());
  assert!(h.jobs.is_empty());
}

#[tokio::test]
#[serial]
async fn test_validation_reports_every_problem_at_once() {
  setup_tracing();
  let h = Harness::new();
  let request = BookingRequest {
    name: None,
    phone: Some("call-me".to_string()),
    seats: Some("0".to_string()),
    date: Some("2031-02-30".to_string()),
    time: Some("7pm".to_string()),
    user_id: None,
    branch_id: Some(Uuid::new_v4().to_string()),
  };

  let err = h.service.create_booking(&request).await.unwrap_err();

  let BistroError::Validation { problems } = &err else {
    panic!("Expected Validation error, got {:?}", err);
  };
  assert_eq!(problems.len(), 6, "problems: {:?}", problems);
  let message = err.to_string();
  for fragment in ["name is required", "Phone number", "seats must be at least 1", "Invalid date", "time must be HH:MM", "userId is required"] {
    assert!(message.contains(fragment), "'{}' missing from '{}'", fragment, message);
  }
  assert!(h.bookings.is_empty());
  assert!(h.jobs.is_empty());
}

#[tokio::test]
#[serial]
async fn test_malformed_reference_is_rejected_after_validation() {
  setup_tracing();
  let h = Harness::new();
  let mut request = booking_request(Uuid::new_v4(), Uuid::new_v4(), "2031-05-17", "19:30");
  request.user_id = Some("not-a-user-id".to_string());

  let err = h.service.create_booking(&request).await.unwrap_err();

  match err {
    BistroError::InvalidReference { field, value } => {
      assert_eq!(field, "userId");
      assert_eq!(value, "not-a-user-id");
    }
    other => panic!("Expected InvalidReference, got {:?}", other),
  }
  assert!(h.bookings.is_empty());
  assert!(h.jobs.is_empty());
}

#[tokio::test]
#[serial]
async fn test_request_text_is_trimmed_and_flexible_formats_accepted() {
  setup_tracing();
  let h = Harness::new();
  let mut request = booking_request(Uuid::new_v4(), Uuid::new_v4(), "2031-05-17T00:00:00Z", " 08:05 ");
  request.name = Some("  Grace Hopper ".to_string());
  request.phone = Some("+447700900123".to_string());

  let booking = h.service.create_booking(&request).await.unwrap();

  assert_eq!(booking.name, "Grace Hopper");
  assert_eq!(booking.phone, 447700900123);
  assert_eq!(booking.date, NaiveDate::from_ymd_opt(2031, 5, 17).unwrap());
  assert_eq!(booking.time, "08:05");
}

#[tokio::test]
#[serial]
async fn test_date_at_end_of_calendar_is_rejected_not_panicking() {
  setup_tracing();
  let bookings = Arc::new(MemoryBookingStore::new());
  let jobs = Arc::new(MemoryJobStore::new());
  let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
  let service = BookingService::new(bookings.clone(), jobs.clone(), minus_five);

  let err = service
    .create_booking(&booking_request(Uuid::new_v4(), Uuid::new_v4(), "+262142-12-31", "23:59"))
    .await
    .unwrap_err();

  assert!(matches!(err, BistroError::Validation { .. }), "got {:?}", err);
  assert!(err.to_string().contains("date is out of range"), "{}", err);
  assert!(bookings.is_empty());
  assert!(jobs.is_empty());
}

#[tokio::test]
#[serial]
async fn test_booking_survives_enqueue_failure() {
  setup_tracing();
  let bookings = Arc::new(MemoryBookingStore::new());
  let jobs = Arc::new(FailingEnqueueStore {
    inner: MemoryJobStore::new(),
  });
  let service = BookingService::new(bookings.clone(), jobs.clone(), utc());

  let booking = service
    .create_booking(&booking_request(Uuid::new_v4(), Uuid::new_v4(), "2031-05-17", "19:30"))
    .await
    .expect("creation succeeds even when scheduling fails");

  assert_eq!(bookings.find_by_id(booking.id).await.unwrap(), Some(booking));
  assert!(jobs.inner.is_empty());
}

#[tokio::test]
#[serial]
async fn test_list_by_user_returns_all_statuses_in_insertion_order() {
  setup_tracing();
  let h = Harness::new();
  let (user, other_user, branch) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  let first = h.service.create_booking(&booking_request(user, branch, "2031-05-20", "12:00")).await.unwrap();
  let _noise = h.service.create_booking(&booking_request(other_user, branch, "2031-05-18", "12:00")).await.unwrap();
  let second = h.service.create_booking(&booking_request(user, branch, "2020-01-01", "12:00")).await.unwrap();
  h.service.update_booking_status(second.id, BookingStatus::Refused).await.unwrap();

  let listed = h.service.list_bookings_by_user(user).await.unwrap();

  let ids: Vec<Uuid> = listed.iter().map(|b| b.id).collect();
  assert_eq!(ids, vec![first.id, second.id]);
  assert_eq!(listed[1].status, BookingStatus::Refused);
}

#[tokio::test]
#[serial]
async fn test_upcoming_by_branch_excludes_past_dates_and_sorts_latest_first() {
  setup_tracing();
  let h = Harness::new();
  let (user, branch, other_branch) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  let day = |offset: i64| days_from_today(offset).format("%Y-%m-%d").to_string();

  let yesterday = h.service.create_booking(&booking_request(user, branch, &day(-1), "23:59")).await.unwrap();
  let today = h.service.create_booking(&booking_request(user, branch, &day(0), "00:00")).await.unwrap();
  let next_week = h.service.create_booking(&booking_request(user, branch, &day(7), "18:00")).await.unwrap();
  let tomorrow = h.service.create_booking(&booking_request(user, branch, &day(1), "18:00")).await.unwrap();
  let _elsewhere = h.service.create_booking(&booking_request(user, other_branch, &day(3), "18:00")).await.unwrap();

  let upcoming = h.service.list_upcoming_bookings_by_branch(branch).await.unwrap();

  let ids: Vec<Uuid> = upcoming.iter().map(|b| b.id).collect();
  assert_eq!(ids, vec![next_week.id, tomorrow.id, today.id]);
  assert!(!ids.contains(&yesterday.id));
}

#[tokio::test]
#[serial]
async fn test_update_status_overwrites_and_reports_missing_booking() {
  setup_tracing();
  let h = Harness::new();
  let booking = h
    .service
    .create_booking(&booking_request(Uuid::new_v4(), Uuid::new_v4(), "2031-05-17", "19:30"))
    .await
    .unwrap();

  let updated = h.service.update_booking_status(booking.id, BookingStatus::Approved).await.unwrap();
  assert_eq!(updated.status, BookingStatus::Approved);
  let reread = h.bookings.find_by_id(booking.id).await.unwrap().unwrap();
  assert_eq!(reread.status, BookingStatus::Approved);

  // No transition check: a terminal status can be overwritten manually.
  h.service.update_booking_status(booking.id, BookingStatus::Expired).await.unwrap();
  let back = h.service.update_booking_status(booking.id, BookingStatus::Pending).await.unwrap();
  assert_eq!(back.status, BookingStatus::Pending);

  // The expiry job is left untouched.
  let job = h.jobs.find_for_booking(EXPIRE_BOOKING, booking.id).await.unwrap().unwrap();
  assert_eq!(job.state, JobState::Pending);

  let missing = h.service.update_booking_status(Uuid::new_v4(), BookingStatus::Approved).await;
  assert!(matches!(missing, Err(BistroError::NotFound { entity: "Booking", .. })));
}

#[test]
fn test_status_parsing() {
  assert_eq!("approved".parse::<BookingStatus>().unwrap(), BookingStatus::Approved);
  assert_eq!(" Completed ".parse::<BookingStatus>().unwrap(), BookingStatus::Completed);
  let err = "cancelled".parse::<BookingStatus>().unwrap_err();
  assert!(err.to_string().contains("Invalid status 'cancelled'"));
  assert!(BookingStatus::Refused.is_terminal());
  assert!(!BookingStatus::Approved.is_terminal());
}
