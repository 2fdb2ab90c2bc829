// bistro_server/src/models/booking.rs

use bistro::{Booking, BookingStatus};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// Column list matching `BookingRow`, for `SELECT` and `RETURNING` clauses.
pub const BOOKING_COLUMNS: &str =
  "id, name, phone, seats, user_id, branch_id, date, time, status, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, SqlxType)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
pub enum BookingStatusDb {
  Pending,
  Approved,
  Refused,
  Expired,
  Completed,
}

impl From<BookingStatus> for BookingStatusDb {
  fn from(status: BookingStatus) -> Self {
    match status {
      BookingStatus::Pending => BookingStatusDb::Pending,
      BookingStatus::Approved => BookingStatusDb::Approved,
      BookingStatus::Refused => BookingStatusDb::Refused,
      BookingStatus::Expired => BookingStatusDb::Expired,
      BookingStatus::Completed => BookingStatusDb::Completed,
    }
  }
}

impl From<BookingStatusDb> for BookingStatus {
  fn from(status: BookingStatusDb) -> Self {
    match status {
      BookingStatusDb::Pending => BookingStatus::Pending,
      BookingStatusDb::Approved => BookingStatus::Approved,
      BookingStatusDb::Refused => BookingStatus::Refused,
      BookingStatusDb::Expired => BookingStatus::Expired,
      BookingStatusDb::Completed => BookingStatus::Completed,
    }
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
  pub id: Uuid,
  pub name: String,
  pub phone: i64,
  pub seats: i32,
  pub user_id: Uuid,
  pub branch_id: Uuid,
  pub date: NaiveDate,
  pub time: String,
  pub status: BookingStatusDb,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
  fn from(row: BookingRow) -> Self {
    Booking {
      id: row.id,
      name: row.name,
      phone: row.phone,
      seats: row.seats,
      user_id: row.user_id,
      branch_id: row.branch_id,
      date: row.date,
      time: row.time,
      status: row.status.into(),
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}
