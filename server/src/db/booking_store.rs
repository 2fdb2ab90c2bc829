// bistro_server/src/db/booking_store.rs

use async_trait::async_trait;
use bistro::{BistroError, BistroResult, Booking, BookingStatus, BookingStore, NewBooking};
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::models::booking::BOOKING_COLUMNS;
use crate::models::{BookingRow, BookingStatusDb};

#[derive(Debug, Clone)]
pub struct PgBookingStore {
  pool: PgPool,
}

impl PgBookingStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

fn into_bookings(rows: Vec<BookingRow>) -> Vec<Booking> {
  rows.into_iter().map(Booking::from).collect()
}

#[async_trait]
impl BookingStore for PgBookingStore {
  #[instrument(name = "PgBookingStore::insert", skip_all, err(Display))]
  async fn insert(&self, booking: NewBooking) -> BistroResult<Booking> {
    let booking = booking.into_booking(Uuid::new_v4(), Utc::now());
    let sql = format!(
      "INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {BOOKING_COLUMNS}"
    );
    let row: BookingRow = sqlx::query_as(&sql)
      .bind(booking.id)
      .bind(&booking.name)
      .bind(booking.phone)
      .bind(booking.seats)
      .bind(booking.user_id)
      .bind(booking.branch_id)
      .bind(booking.date)
      .bind(&booking.time)
      .bind(BookingStatusDb::from(booking.status))
      .bind(booking.created_at)
      .bind(booking.updated_at)
      .fetch_one(&self.pool)
      .await
      .map_err(BistroError::persistence)?;
    Ok(row.into())
  }

  async fn find_by_id(&self, id: Uuid) -> BistroResult<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
    let row: Option<BookingRow> = sqlx::query_as(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(BistroError::persistence)?;
    Ok(row.map(Booking::from))
  }

  async fn list_by_user(&self, user_id: Uuid) -> BistroResult<Vec<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at, id");
    let rows: Vec<BookingRow> = sqlx::query_as(&sql)
      .bind(user_id)
      .fetch_all(&self.pool)
      .await
      .map_err(BistroError::persistence)?;
    Ok(into_bookings(rows))
  }

  async fn list_by_branch_from(&self, branch_id: Uuid, from: NaiveDate) -> BistroResult<Vec<Booking>> {
    let sql = format!(
      "SELECT {BOOKING_COLUMNS} FROM bookings WHERE branch_id = $1 AND date >= $2 ORDER BY date DESC, created_at, id"
    );
    let rows: Vec<BookingRow> = sqlx::query_as(&sql)
      .bind(branch_id)
      .bind(from)
      .fetch_all(&self.pool)
      .await
      .map_err(BistroError::persistence)?;
    Ok(into_bookings(rows))
  }

  #[instrument(name = "PgBookingStore::set_status", skip(self), err(Display))]
  async fn set_status(&self, id: Uuid, status: BookingStatus) -> BistroResult<Option<Booking>> {
    let sql = format!("UPDATE bookings SET status = $2, updated_at = now() WHERE id = $1 RETURNING {BOOKING_COLUMNS}");
    let row: Option<BookingRow> = sqlx::query_as(&sql)
      .bind(id)
      .bind(BookingStatusDb::from(status))
      .fetch_optional(&self.pool)
      .await
      .map_err(BistroError::persistence)?;
    Ok(row.map(Booking::from))
  }

  #[instrument(name = "PgBookingStore::set_status_if", skip(self), err(Display))]
  async fn set_status_if(
    &self,
    id: Uuid,
    expected: BookingStatus,
    status: BookingStatus,
  ) -> BistroResult<Option<Booking>> {
    let sql = format!(
      "UPDATE bookings SET status = $3, updated_at = now() WHERE id = $1 AND status = $2 RETURNING {BOOKING_COLUMNS}"
    );
    let row: Option<BookingRow> = sqlx::query_as(&sql)
      .bind(id)
      .bind(BookingStatusDb::from(expected))
      .bind(BookingStatusDb::from(status))
      .fetch_optional(&self.pool)
      .await
      .map_err(BistroError::persistence)?;
    Ok(row.map(Booking::from))
  }

  async fn list_unresolved(&self) -> BistroResult<Vec<Booking>> {
    let sql = format!(
      "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status IN ('pending', 'approved') ORDER BY created_at, id"
    );
    let rows: Vec<BookingRow> = sqlx::query_as(&sql)
      .fetch_all(&self.pool)
      .await
      .map_err(BistroError::persistence)?;
    Ok(into_bookings(rows))
  }
}
