//! Customer data-access core.
//! This crate owns the `customers` table contract: create and lookup by email.

pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::RepoConfig;
pub use context::{ContextDone, OpContext};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::customer::{Customer, CustomerId, CustomerValidationError};
pub use repo::customer_repo::{CustomerRepository, RepoError, RepoResult, SqliteCustomerRepository};
pub use service::customer_service::CustomerService;

/// Minimal health-check API for linkage probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
