// bistro_server/src/web/handlers/mod.rs

pub mod booking_handlers;
