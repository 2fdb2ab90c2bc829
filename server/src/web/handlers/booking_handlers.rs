// bistro_server/src/web/handlers/booking_handlers.rs

use actix_web::{web, HttpResponse};
use bistro::{parse_reference, BookingRequest, BookingStatus};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

// --- Request DTOs ---

/// Reservation form fields. Any JSON scalar is accepted (`phone` and `seats`
/// commonly arrive as numbers) so that type mistakes surface as validation
/// problems rather than extractor errors.
#[derive(Deserialize, Debug, Default)]
pub struct ReserveDetails {
  pub name: Option<Value>,
  pub phone: Option<Value>,
  pub seats: Option<Value>,
  pub date: Option<Value>,
  pub time: Option<Value>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingPayload {
  #[serde(default)]
  pub reserve_details: Option<ReserveDetails>,
  pub user_id: Option<Value>,
  pub branch_id: Option<Value>,
}

impl From<CreateBookingPayload> for BookingRequest {
  fn from(payload: CreateBookingPayload) -> Self {
    let details = payload.reserve_details.unwrap_or_default();
    BookingRequest {
      name: details.name.and_then(scalar_text),
      phone: details.phone.and_then(scalar_text),
      seats: details.seats.and_then(scalar_text),
      date: details.date.and_then(scalar_text),
      time: details.time.and_then(scalar_text),
      user_id: payload.user_id.and_then(scalar_text),
      branch_id: payload.branch_id.and_then(scalar_text),
    }
  }
}

/// Text form of a JSON scalar; `null` counts as absent. Other values are kept
/// verbatim so validation reports them as malformed.
fn scalar_text(value: Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s),
    Value::Number(n) => Some(n.to_string()),
    other => Some(other.to_string()),
  }
}

#[derive(Deserialize, Debug)]
pub struct UpdateBookingPayload {
  pub id: Option<Value>,
  pub status: Option<Value>,
}

// --- Handler Implementations ---

#[instrument(name = "handler::create_booking", skip(app_state, payload))]
pub async fn create_booking_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CreateBookingPayload>,
) -> Result<HttpResponse, AppError> {
  let request = BookingRequest::from(payload.into_inner());
  let booking = app_state.bookings.create_booking(&request).await?;
  info!(booking_id = %booking.id, "Booking created.");

  Ok(HttpResponse::Ok().json(json!({
    "message": "Booking Added Successfully",
    "booking": booking
  })))
}

#[instrument(name = "handler::list_user_bookings", skip(app_state, path), fields(user_id = %path.as_str()))]
pub async fn list_user_bookings_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let user_id = parse_reference("userId", &path.into_inner())?;
  let bookings = app_state.bookings.list_bookings_by_user(user_id).await?;
  info!("Fetched {} bookings for user.", bookings.len());
  Ok(HttpResponse::Ok().json(bookings))
}

#[instrument(name = "handler::list_branch_bookings", skip(app_state, path), fields(branch_id = %path.as_str()))]
pub async fn list_branch_bookings_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let branch_id = parse_reference("branchId", &path.into_inner())?;
  let bookings = app_state.bookings.list_upcoming_bookings_by_branch(branch_id).await?;
  info!("Fetched {} upcoming bookings for branch.", bookings.len());
  Ok(HttpResponse::Ok().json(bookings))
}

#[instrument(name = "handler::update_booking", skip(app_state, payload))]
pub async fn update_booking_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<UpdateBookingPayload>,
) -> Result<HttpResponse, AppError> {
  let UpdateBookingPayload { id, status } = payload.into_inner();
  let (Some(id), Some(status)) = (non_blank(id), non_blank(status)) else {
    return Err(AppError::BadRequest("All fields are required.".to_string()));
  };

  let booking_id = parse_reference("id", &id)?;
  let status: BookingStatus = status.parse()?;
  app_state.bookings.update_booking_status(booking_id, status).await?;

  Ok(HttpResponse::Ok().json(json!({ "message": "Booking Updated Successfully" })))
}

fn non_blank(value: Option<Value>) -> Option<String> {
  value.and_then(scalar_text).filter(|v| !v.trim().is_empty())
}
