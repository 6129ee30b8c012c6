//! Repository layer for catalog persistence.
//!
//! # Responsibility
//! - Define query/write contracts over the paper collection.
//! - Keep SQLite details out of the catalog service.
//!
//! # Invariants
//! - Repository writes enforce `Paper::validate()` before persistence.
//! - Engine failures surface as errors, never as empty results.

pub mod paper_repo;
