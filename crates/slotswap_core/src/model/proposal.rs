//! Swap proposal domain model.
//!
//! # Responsibility
//! - Define the pairwise proposal record and its resolution state machine.
//!
//! # Invariants
//! - `proposer != recipient` and `offered_slot != requested_slot`.
//! - State moves `Open -> Accepted | Rejected` exactly once.

use crate::model::slot::SlotId;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a swap proposal.
pub type ProposalId = Uuid;

/// Proposal lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    Open,
    Accepted,
    Rejected,
}

impl ProposalState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        match self {
            Self::Open => false,
            Self::Accepted | Self::Rejected => true,
        }
    }

    /// Applies a recipient decision.
    ///
    /// Returns `None` when the proposal is already terminal.
    pub fn resolve(self, decision: Decision) -> Option<Self> {
        match (self, decision) {
            (Self::Open, Decision::Accept) => Some(Self::Accepted),
            (Self::Open, Decision::Reject) => Some(Self::Rejected),
            (Self::Accepted | Self::Rejected, _) => None,
        }
    }
}

impl Display for ProposalState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recipient's answer to an open proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn from_accept(accept: bool) -> Self {
        if accept {
            Self::Accept
        } else {
            Self::Reject
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

/// A pairwise offer to exchange `offered_slot` for `requested_slot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub uuid: ProposalId,
    pub proposer: UserId,
    pub recipient: UserId,
    /// Owned by `proposer` at creation time.
    pub offered_slot: SlotId,
    /// Owned by `recipient` at creation time.
    pub requested_slot: SlotId,
    pub state: ProposalState,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds; set exactly when state is terminal.
    pub resolved_at: Option<i64>,
}

impl Proposal {
    /// Creates a new open proposal with a generated id.
    pub fn open(
        proposer: UserId,
        recipient: UserId,
        offered_slot: SlotId,
        requested_slot: SlotId,
        created_at: i64,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            proposer,
            recipient,
            offered_slot,
            requested_slot,
            state: ProposalState::Open,
            created_at,
            resolved_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == ProposalState::Open
    }

    pub fn references_slot(&self, slot: SlotId) -> bool {
        self.offered_slot == slot || self.requested_slot == slot
    }

    pub fn is_party(&self, user: UserId) -> bool {
        self.proposer == user || self.recipient == user
    }
}

#[cfg(test)]
mod tests {
    use super::{Decision, Proposal, ProposalState};
    use uuid::Uuid;

    #[test]
    fn open_resolves_exactly_once() {
        assert_eq!(
            ProposalState::Open.resolve(Decision::Accept),
            Some(ProposalState::Accepted)
        );
        assert_eq!(
            ProposalState::Open.resolve(Decision::Reject),
            Some(ProposalState::Rejected)
        );
        assert_eq!(ProposalState::Accepted.resolve(Decision::Reject), None);
        assert_eq!(ProposalState::Rejected.resolve(Decision::Accept), None);
    }

    #[test]
    fn new_proposal_is_open_and_references_both_slots() {
        let offered = Uuid::new_v4();
        let requested = Uuid::new_v4();
        let proposal = Proposal::open(Uuid::new_v4(), Uuid::new_v4(), offered, requested, 42);
        assert!(proposal.is_open());
        assert!(proposal.references_slot(offered));
        assert!(proposal.references_slot(requested));
        assert!(!proposal.references_slot(Uuid::new_v4()));
        assert_eq!(proposal.resolved_at, None);
    }

    #[test]
    fn decision_maps_from_flag() {
        assert_eq!(Decision::from_accept(true), Decision::Accept);
        assert_eq!(Decision::from_accept(false), Decision::Reject);
    }
}
