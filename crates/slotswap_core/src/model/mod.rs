//! Domain model for the swap negotiation engine.
//!
//! # Responsibility
//! - Define slot, proposal and user records shared by stores and services.
//! - Model exchange state as closed enums with exhaustive transitions.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - A slot is `PendingExchange` iff exactly one open proposal references it.

pub mod proposal;
pub mod slot;
pub mod user;
