// bistro/src/booking/request.rs

//! Raw booking input and its validation into a `NewBooking`.

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::booking::model::{NewBooking, TIME_FORMAT};
use crate::error::{BistroError, BistroResult};

/// Booking fields as received from a transport. Every field is optional text so
/// that validation can report all missing or malformed values at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
  pub name: Option<String>,
  pub phone: Option<String>,
  pub seats: Option<String>,
  pub date: Option<String>,
  pub time: Option<String>,
  pub user_id: Option<String>,
  pub branch_id: Option<String>,
}

impl BookingRequest {
  /// Checks every field and returns one combined `Validation` error listing all
  /// problems. Reference ids are checked afterwards and fail with
  /// `InvalidReference`.
  pub fn validate(&self) -> BistroResult<NewBooking> {
    let mut problems = Vec::new();

    let name = required(&self.name, "name", &mut problems).map(str::to_string);
    let phone = required(&self.phone, "phone", &mut problems).and_then(|raw| {
      let parsed = parse_phone(raw);
      if parsed.is_none() {
        problems.push(format!("Phone number must be a valid number, got '{}'", raw));
      }
      parsed
    });
    let seats = required(&self.seats, "seats", &mut problems).and_then(|raw| match raw.parse::<i32>() {
      Ok(n) if n >= 1 => Some(n),
      Ok(n) => {
        problems.push(format!("seats must be at least 1, got {}", n));
        None
      }
      Err(_) => {
        problems.push(format!("seats must be a whole number, got '{}'", raw));
        None
      }
    });
    let date = required(&self.date, "date", &mut problems).and_then(|raw| {
      let parsed = parse_date(raw);
      if parsed.is_none() {
        problems.push(format!("Invalid date format: '{}'", raw));
      }
      parsed
    });
    let time = required(&self.time, "time", &mut problems).and_then(|raw| {
      let parsed = NaiveTime::parse_from_str(raw, TIME_FORMAT).ok();
      if parsed.is_none() {
        problems.push(format!("time must be HH:MM, got '{}'", raw));
      }
      parsed
    });
    let user_raw = required(&self.user_id, "userId", &mut problems);
    let branch_raw = required(&self.branch_id, "branchId", &mut problems);

    if !problems.is_empty() {
      return Err(BistroError::Validation { problems });
    }

    let (Some(name), Some(phone), Some(seats), Some(date), Some(time), Some(user_raw), Some(branch_raw)) =
      (name, phone, seats, date, time, user_raw, branch_raw)
    else {
      return Err(BistroError::Internal(
        "Booking validation passed with unset fields".to_string(),
      ));
    };

    Ok(NewBooking {
      name,
      phone,
      seats,
      user_id: parse_reference("userId", user_raw)?,
      branch_id: parse_reference("branchId", branch_raw)?,
      date,
      time,
    })
  }
}

/// Parses an entity reference (user, branch, booking id).
pub fn parse_reference(field: &'static str, raw: &str) -> BistroResult<Uuid> {
  Uuid::parse_str(raw.trim()).map_err(|_| BistroError::InvalidReference {
    field,
    value: raw.to_string(),
  })
}

fn required<'a>(value: &'a Option<String>, field: &str, problems: &mut Vec<String>) -> Option<&'a str> {
  match value.as_deref().map(str::trim) {
    Some(v) if !v.is_empty() => Some(v),
    _ => {
      problems.push(format!("{} is required", field));
      None
    }
  }
}

fn parse_phone(raw: &str) -> Option<i64> {
  let digits = raw.strip_prefix('+').unwrap_or(raw);
  if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
    return None;
  }
  digits.parse().ok()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}
