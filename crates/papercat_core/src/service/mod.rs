//! Catalog use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into catalog-level APIs.
//! - Keep host applications decoupled from storage details.

pub mod catalog_service;
