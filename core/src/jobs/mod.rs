// bistro/src/jobs/mod.rs

pub mod expiry;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod runner;
