//! Catalog domain model.
//!
//! # Responsibility
//! - Define the canonical paper record shared by import, enrichment and
//!   query paths.
//!
//! # Invariants
//! - Every paper is identified by a stable `PaperId`.
//! - The abstract field encodes enrichment state (see `AbstractState`).

pub mod paper;
