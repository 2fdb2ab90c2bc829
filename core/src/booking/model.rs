// bistro/src/booking/model.rs

//! Booking records and their status lifecycle.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{BistroError, BistroResult};

/// Wall-clock format of `Booking::time`.
pub const TIME_FORMAT: &str = "%H:%M";

/// Reservation status. `Refused`, `Expired` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
  Pending,
  Approved,
  Refused,
  Expired,
  Completed,
}

impl BookingStatus {
  pub const ALL: [BookingStatus; 5] = [
    BookingStatus::Pending,
    BookingStatus::Approved,
    BookingStatus::Refused,
    BookingStatus::Expired,
    BookingStatus::Completed,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      BookingStatus::Pending => "pending",
      BookingStatus::Approved => "approved",
      BookingStatus::Refused => "refused",
      BookingStatus::Expired => "expired",
      BookingStatus::Completed => "completed",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      BookingStatus::Refused | BookingStatus::Expired | BookingStatus::Completed
    )
  }
}

impl fmt::Display for BookingStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BookingStatus {
  type Err = BistroError;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let wanted = raw.trim();
    BookingStatus::ALL
      .iter()
      .copied()
      .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| {
        let expected: Vec<&str> = BookingStatus::ALL.iter().map(|s| s.as_str()).collect();
        BistroError::validation(format!(
          "Invalid status '{}'. Expected one of: {}",
          raw,
          expected.join(", ")
        ))
      })
  }
}

/// A persisted reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
  pub id: Uuid,
  pub name: String,
  pub phone: i64,
  pub seats: i32,
  pub user_id: Uuid,
  pub branch_id: Uuid,
  pub date: NaiveDate,
  /// `HH:MM`, local to the branch.
  pub time: String,
  pub status: BookingStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Booking {
  /// Instant at which this booking's expiry job should fire.
  pub fn fire_at(&self, branch_offset: FixedOffset) -> BistroResult<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(self.time.trim(), TIME_FORMAT).map_err(|e| {
      BistroError::Internal(format!(
        "Stored booking {} has unreadable time '{}': {}",
        self.id, self.time, e
      ))
    })?;
    combine(self.date, time, branch_offset)
  }
}

/// A validated booking that has not been stored yet. Produced by
/// `BookingRequest::validate`; the store assigns id, status and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
  pub name: String,
  pub phone: i64,
  pub seats: i32,
  pub user_id: Uuid,
  pub branch_id: Uuid,
  pub date: NaiveDate,
  pub time: NaiveTime,
}

impl NewBooking {
  pub fn time_label(&self) -> String {
    self.time.format(TIME_FORMAT).to_string()
  }

  pub fn fire_at(&self, branch_offset: FixedOffset) -> BistroResult<DateTime<Utc>> {
    combine(self.date, self.time, branch_offset)
  }

  /// Materializes the record a store persists on insert.
  pub fn into_booking(self, id: Uuid, now: DateTime<Utc>) -> Booking {
    let time = self.time_label();
    Booking {
      id,
      name: self.name,
      phone: self.phone,
      seats: self.seats,
      user_id: self.user_id,
      branch_id: self.branch_id,
      date: self.date,
      time,
      status: BookingStatus::Pending,
      created_at: now,
      updated_at: now,
    }
  }
}

/// Combines a branch-local date and wall-clock time into a UTC instant.
/// Dates at the edge of the representable range fail with a `Validation` error.
pub fn combine(date: NaiveDate, time: NaiveTime, branch_offset: FixedOffset) -> BistroResult<DateTime<Utc>> {
  let local = date.and_time(time);
  let offset = TimeDelta::seconds(i64::from(branch_offset.local_minus_utc()));
  local
    .checked_sub_signed(offset)
    .map(|utc| Utc.from_utc_datetime(&utc))
    .ok_or_else(|| BistroError::validation(format!("date is out of range: '{}'", date)))
}

/// Today's date as seen from the branch.
pub fn branch_today(branch_offset: FixedOffset) -> NaiveDate {
  Utc::now().with_timezone(&branch_offset).date_naive()
}
