// bistro/src/booking/mod.rs

pub mod model;
pub mod request;
pub mod service;
