//! Attribute-level authorization of query results.
//!
//! # Responsibility
//! - Strip fields the actor's role may not view from fetched records.
//! - Derive store-side exclusion projections from permission tables.
//!
//! # Invariants
//! - Default-deny: undeclared attributes are removed for non-admin roles.
//! - `admin` output equals the unfiltered input.

pub mod projection;
pub mod result_filter;
