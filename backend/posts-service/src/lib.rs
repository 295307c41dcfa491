/// Posts Service Library
///
/// REST backend for location-tagged posts owned by user accounts.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `models`: User and Post records
/// - `services`: post coordinator, user directory, geocoding, file storage
/// - `db`: `Store` trait with PostgreSQL and in-memory backends
/// - `validators`: request payload rules
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;
pub mod validators;

pub use config::Config;
pub use error::{AppError, Result};
