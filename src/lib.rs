//! Badge-event validation and attendance reconciliation, with in-memory and
//! MySQL adapters and an actix-web shell.

pub mod api;
pub mod config;
pub mod db;
pub mod docs;
pub mod engine;
pub mod error;
pub mod model;
pub mod routes;
pub mod store;
pub mod utils;

pub use engine::{AttendanceEngine, EngineOptions, Reconciliation};
pub use error::{EngineError, QueryError, Severity};
