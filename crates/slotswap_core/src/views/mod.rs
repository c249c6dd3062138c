//! Read-side views composed from slot, proposal and user rows.
//!
//! # Responsibility
//! - Join proposals with their slots and parties for listing screens.
//! - List the exchangeable-slot marketplace with owner detail attached.
//!
//! # Invariants
//! - Views never write; each listing is a single point-in-time query.
//! - Join logic lives here, not in the write-side state machine.

pub mod marketplace;
pub mod proposals;
