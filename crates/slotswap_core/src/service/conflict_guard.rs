//! Conflict guard: at most one open proposal per slot.
//!
//! # Responsibility
//! - Look up open proposals referencing a slot as offered or requested slot.
//! - Refuse proposal creation and slot edits that would touch a held slot.
//!
//! # Invariants
//! - Callers run these checks inside the same `BEGIN IMMEDIATE` transaction
//!   as the writes they protect.
//! - Proposal creation and the slot edit guard share `open_proposal_for_slot`.

use crate::model::proposal::Proposal;
use crate::model::slot::SlotId;
use crate::repo::proposal_repo::ProposalRepository;
use crate::repo::RepoResult;
use crate::service::swap_error::{SwapError, SwapResult};

/// Returns the open proposal currently holding `slot`, if any.
pub fn open_proposal_for_slot<R: ProposalRepository + ?Sized>(
    proposals: &R,
    slot: SlotId,
) -> RepoResult<Option<Proposal>> {
    proposals.find_open_for_slot(slot)
}

/// Confirms no open proposal references any of `slots`.
///
/// Callers pass slots already checked to be `Exchangeable`, so any open
/// proposal found here breaks the pending pairing and is reported as an
/// integrity violation. Held slots surface earlier as `Conflict` through
/// [`attach_holder`].
pub fn ensure_slots_free<R: ProposalRepository + ?Sized>(
    proposals: &R,
    slots: &[SlotId],
) -> SwapResult<()> {
    for &slot in slots {
        let open_count = proposals.count_open_for_slot(slot)?;
        if open_count > 1 {
            return Err(SwapError::IntegrityViolation(format!(
                "slot {slot} is referenced by {open_count} open proposals"
            )));
        }
        if let Some(existing) = open_proposal_for_slot(proposals, slot)? {
            return Err(SwapError::IntegrityViolation(format!(
                "slot {slot} is exchangeable but held by open proposal {}",
                existing.uuid
            )));
        }
    }
    Ok(())
}

/// Fills in the holding proposal id on a `Conflict` raised without one.
pub fn attach_holder<R: ProposalRepository + ?Sized>(proposals: &R, err: SwapError) -> SwapError {
    match err {
        SwapError::Conflict {
            slot,
            proposal: None,
        } => match open_proposal_for_slot(proposals, slot) {
            Ok(Some(existing)) => SwapError::Conflict {
                slot,
                proposal: Some(existing.uuid),
            },
            Ok(None) => SwapError::IntegrityViolation(format!(
                "slot {slot} is pending exchange without an open proposal"
            )),
            Err(repo_err) => repo_err.into(),
        },
        other => other,
    }
}
