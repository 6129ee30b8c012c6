//! Core of the paper catalog.
//! Owns the paper record, its SQLite storage and the catalog queries.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod settings;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::paper::{AbstractState, Paper, PaperId, PaperValidationError, NO_ABSTRACT};
pub use repo::paper_repo::{PaperRepository, RepoError, RepoResult, SqlitePaperRepository};
pub use service::catalog_service::{ImportOutcome, PaperCatalog};
pub use settings::{CatalogConfig, ConfigError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
