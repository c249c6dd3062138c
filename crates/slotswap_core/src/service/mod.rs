//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into caller-facing operations.
//! - Own transaction boundaries for every multi-row mutation.
//!
//! # Invariants
//! - Writes that read-then-mutate run under `BEGIN IMMEDIATE`.
//! - A failed operation leaves committed state unchanged.

pub mod conflict_guard;
pub mod eligibility;
pub mod slot_service;
pub mod swap_error;
pub mod swap_service;
