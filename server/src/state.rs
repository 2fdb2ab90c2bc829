// bistro_server/src/state.rs
use bistro::BookingService;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
  /// `None` when the booking API runs over in-memory stores.
  pub db_pool: Option<PgPool>,
  pub bookings: BookingService,
}
