// bistro_server/src/models/mod.rs

//! Row types for the `bookings` and `scheduled_jobs` tables.

pub mod booking;
pub mod scheduled_job;

pub use booking::{BookingRow, BookingStatusDb};
pub use scheduled_job::{JobStateDb, ScheduledJobRow};
