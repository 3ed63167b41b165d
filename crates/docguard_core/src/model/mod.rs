//! Record-level domain model shared by filtering, stores and services.
//!
//! # Responsibility
//! - Define the document shape passed between stores and callers.
//! - Define static per-schema permission declarations.
//! - Resolve the requesting actor's role.
//!
//! # Invariants
//! - Permission tables are immutable once built.
//! - Every stored document carries a stable `_id`.

pub mod context;
pub mod document;
pub mod permissions;
pub mod schema;
