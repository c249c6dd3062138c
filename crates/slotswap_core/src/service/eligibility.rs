//! Eligibility validator for new swap proposals.
//!
//! # Responsibility
//! - Decide whether two resolved slots may be paired by a proposer.
//!
//! # Invariants
//! - Pure: no store access, no side effects.
//! - Checks run in a fixed order and stop at the first failure: identical
//!   ids, existence, offered ownership, requested ownership, offered state,
//!   requested state.

use crate::model::slot::{Slot, SlotId, SlotState};
use crate::model::user::UserId;
use crate::service::swap_error::{SwapError, SwapResult};

/// Two slots that passed every eligibility check.
#[derive(Debug, Clone, Copy)]
pub struct EligiblePair<'a> {
    pub offered: &'a Slot,
    pub requested: &'a Slot,
}

impl EligiblePair<'_> {
    /// Owner of the requested slot, who receives the proposal.
    pub fn recipient(&self) -> UserId {
        self.requested.owner
    }
}

/// Validates a candidate pairing.
///
/// `offered`/`requested` are the lookups for `offered_id`/`requested_id`;
/// `None` means the id did not resolve.
pub fn check_eligibility<'a>(
    proposer: UserId,
    offered_id: SlotId,
    requested_id: SlotId,
    offered: Option<&'a Slot>,
    requested: Option<&'a Slot>,
) -> SwapResult<EligiblePair<'a>> {
    if offered_id == requested_id {
        return Err(SwapError::SelfSwap {
            offered_slot: offered_id,
            requested_slot: requested_id,
        });
    }

    let offered = offered.ok_or(SwapError::SlotNotFound(offered_id))?;
    let requested = requested.ok_or(SwapError::SlotNotFound(requested_id))?;

    if !offered.is_owned_by(proposer) {
        return Err(SwapError::OwnershipMismatch {
            slot: offered.uuid,
            owner: offered.owner,
            actor: proposer,
        });
    }

    if requested.is_owned_by(proposer) {
        return Err(SwapError::SelfSwap {
            offered_slot: offered_id,
            requested_slot: requested_id,
        });
    }

    ensure_exchangeable(offered)?;
    ensure_exchangeable(requested)?;

    Ok(EligiblePair { offered, requested })
}

fn ensure_exchangeable(slot: &Slot) -> SwapResult<()> {
    match slot.state {
        SlotState::Exchangeable => Ok(()),
        // Pending means an open proposal already holds the slot.
        SlotState::PendingExchange => Err(SwapError::Conflict {
            slot: slot.uuid,
            proposal: None,
        }),
        SlotState::Ordinary => Err(SwapError::NotExchangeable {
            slot: slot.uuid,
            state: slot.state,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::check_eligibility;
    use crate::model::slot::{Slot, SlotState};
    use crate::service::swap_error::SwapError;
    use uuid::Uuid;

    fn exchangeable(owner: Uuid, title: &str) -> Slot {
        let mut slot = Slot::new(owner, title, 1_000, 2_000).unwrap();
        slot.state = SlotState::Exchangeable;
        slot
    }

    #[test]
    fn accepts_two_exchangeable_slots_of_different_owners() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let a = exchangeable(alice, "A");
        let b = exchangeable(bob, "B");

        let pair = check_eligibility(alice, a.uuid, b.uuid, Some(&a), Some(&b)).unwrap();
        assert_eq!(pair.recipient(), bob);
        assert_eq!(pair.offered.uuid, a.uuid);
    }

    #[test]
    fn same_slot_on_both_sides_is_self_swap_even_if_missing() {
        let id = Uuid::new_v4();
        let err = check_eligibility(Uuid::new_v4(), id, id, None, None).unwrap_err();
        assert!(matches!(err, SwapError::SelfSwap { .. }));
    }

    #[test]
    fn missing_slots_are_reported_by_id() {
        let alice = Uuid::new_v4();
        let a = exchangeable(alice, "A");
        let missing = Uuid::new_v4();

        let err = check_eligibility(alice, a.uuid, missing, Some(&a), None).unwrap_err();
        assert!(matches!(err, SwapError::SlotNotFound(id) if id == missing));

        let err = check_eligibility(alice, missing, a.uuid, None, Some(&a)).unwrap_err();
        assert!(matches!(err, SwapError::SlotNotFound(id) if id == missing));
    }

    #[test]
    fn ownership_is_checked_before_state() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut a = exchangeable(bob, "A");
        a.state = SlotState::Ordinary;
        let b = exchangeable(bob, "B");

        let err = check_eligibility(alice, a.uuid, b.uuid, Some(&a), Some(&b)).unwrap_err();
        assert!(matches!(err, SwapError::OwnershipMismatch { actor, .. } if actor == alice));
    }

    #[test]
    fn requesting_own_slot_is_self_swap() {
        let alice = Uuid::new_v4();
        let a = exchangeable(alice, "A");
        let b = exchangeable(alice, "B");

        let err = check_eligibility(alice, a.uuid, b.uuid, Some(&a), Some(&b)).unwrap_err();
        assert!(matches!(err, SwapError::SelfSwap { .. }));
    }

    #[test]
    fn ordinary_slot_is_not_exchangeable_and_pending_is_conflict() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let a = exchangeable(alice, "A");
        let mut b = exchangeable(bob, "B");

        b.state = SlotState::Ordinary;
        let err = check_eligibility(alice, a.uuid, b.uuid, Some(&a), Some(&b)).unwrap_err();
        assert!(matches!(
            err,
            SwapError::NotExchangeable { slot, state: SlotState::Ordinary } if slot == b.uuid
        ));

        b.state = SlotState::PendingExchange;
        let err = check_eligibility(alice, a.uuid, b.uuid, Some(&a), Some(&b)).unwrap_err();
        assert!(matches!(err, SwapError::Conflict { slot, proposal: None } if slot == b.uuid));
    }
}
