// bistro_server/src/web/routes.rs

use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::handlers::booking_handlers;

/// Reports `ok` once the database answers; in-memory deployments are always healthy.
async fn health_check_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  if let Some(pool) = &app_state.db_pool {
    crate::db::ping(pool).await?;
  }
  Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

/// Malformed JSON bodies get the same `{error}` shape as every other rejection.
fn json_config() -> web::JsonConfig {
  web::JsonConfig::default()
    .error_handler(|err, _req| AppError::BadRequest(format!("Invalid JSON body: {}", err)).into())
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.app_data(json_config());
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/bookings")
          .route("", web::post().to(booking_handlers::create_booking_handler))
          .route("", web::put().to(booking_handlers::update_booking_handler))
          .route(
            "/user/{user_id}",
            web::get().to(booking_handlers::list_user_bookings_handler),
          )
          .route(
            "/branch/{branch_id}",
            web::get().to(booking_handlers::list_branch_bookings_handler),
          ),
      ),
  );
}
