// bistro/src/lib.rs

//! Bistro: booking lifecycle and expiry scheduling for restaurant reservations.
//!
//! A booking is created `pending` together with a persisted `expire booking`
//! job firing at the reservation's date and time. Managers may approve or
//! refuse the booking meanwhile. When the job fires, the runner resolves the
//! booking: `approved` becomes `completed`, `pending` becomes `expired`, and
//! terminal statuses are left alone.
//!
//!  - `booking`: records, request validation and the `BookingService` API.
//!  - `store`: async `BookingStore` / `JobStore` contracts and in-memory stores.
//!  - `jobs`: job records, the handler registry, the polling `JobRunner`, the
//!    expiry handler and the reconciliation sweep.

pub mod booking;
pub mod error;
pub mod jobs;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::booking::model::{combine, Booking, BookingStatus, NewBooking};
pub use crate::booking::request::{parse_reference, BookingRequest};
pub use crate::booking::service::BookingService;

pub use crate::jobs::expiry::{resolve_expiry, ExpiryHandler, ExpiryOutcome};
pub use crate::jobs::model::{Enqueued, ExpiryPayload, JobState, NewJob, ScheduledJob, EXPIRE_BOOKING};
pub use crate::jobs::reconcile::{Reconciler, SweepReport};
pub use crate::jobs::registry::{JobHandler, JobRegistry};
pub use crate::jobs::runner::{JobRunner, RunnerConfig, RunnerHandle};

pub use crate::store::memory::{MemoryBookingStore, MemoryJobStore};
pub use crate::store::{BookingStore, JobStore};

pub use crate::error::{BistroError, BistroResult};
