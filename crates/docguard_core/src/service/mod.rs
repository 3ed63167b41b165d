//! CRUD use-case services.
//!
//! # Responsibility
//! - Delegate record operations to the document store.
//! - Filter every successful outcome for the actor's role.
//! - Settle store failures per the configured error mode.

pub mod crud_service;
pub mod response;
