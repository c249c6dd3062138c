//! Caller-facing error taxonomy of the swap engine.

use crate::model::proposal::{ProposalId, ProposalState};
use crate::model::slot::{SlotId, SlotState};
use crate::model::user::UserId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SwapResult<T> = Result<T, SwapError>;

/// Coarse error classes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapErrorKind {
    /// Malformed identifiers or input.
    Validation,
    /// Slot or proposal id did not resolve.
    NotFound,
    /// Actor is not the permitted party.
    Unauthorized,
    /// Slot already tied to an open proposal, or proposal already resolved.
    StateConflict,
    /// Proposer and recipient (or the two slots) are identical.
    SelfReference,
    /// Slot/proposal pairing is broken in storage.
    Integrity,
    /// Store unavailable or commit failure; safe to retry.
    Infrastructure,
}

/// Errors from proposal creation, resolution and read operations.
#[derive(Debug)]
pub enum SwapError {
    InvalidInput(String),
    SlotNotFound(SlotId),
    ProposalNotFound(ProposalId),
    /// Offered slot is not owned by the proposer.
    OwnershipMismatch {
        slot: SlotId,
        owner: UserId,
        actor: UserId,
    },
    /// Both slots are the same, or the requested slot also belongs to the
    /// proposer.
    SelfSwap {
        offered_slot: SlotId,
        requested_slot: SlotId,
    },
    NotExchangeable {
        slot: SlotId,
        state: SlotState,
    },
    /// Slot is already referenced by an open proposal.
    Conflict {
        slot: SlotId,
        proposal: Option<ProposalId>,
    },
    /// Only the recorded recipient may resolve a proposal.
    Unauthorized {
        proposal: ProposalId,
        actor: UserId,
    },
    AlreadyProcessed {
        proposal: ProposalId,
        state: ProposalState,
    },
    IntegrityViolation(String),
    Repo(RepoError),
}

impl SwapError {
    pub fn kind(&self) -> SwapErrorKind {
        match self {
            Self::InvalidInput(_) => SwapErrorKind::Validation,
            Self::SlotNotFound(_) | Self::ProposalNotFound(_) => SwapErrorKind::NotFound,
            Self::OwnershipMismatch { .. } | Self::Unauthorized { .. } => {
                SwapErrorKind::Unauthorized
            }
            Self::NotExchangeable { .. }
            | Self::Conflict { .. }
            | Self::AlreadyProcessed { .. } => SwapErrorKind::StateConflict,
            Self::SelfSwap { .. } => SwapErrorKind::SelfReference,
            Self::IntegrityViolation(_) => SwapErrorKind::Integrity,
            Self::Repo(_) => SwapErrorKind::Infrastructure,
        }
    }

    /// Stable machine-readable code used in logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::SlotNotFound(_) => "slot_not_found",
            Self::ProposalNotFound(_) => "proposal_not_found",
            Self::OwnershipMismatch { .. } => "ownership_mismatch",
            Self::SelfSwap { .. } => "self_swap",
            Self::NotExchangeable { .. } => "not_exchangeable",
            Self::Conflict { .. } => "conflict",
            Self::Unauthorized { .. } => "unauthorized",
            Self::AlreadyProcessed { .. } => "already_processed",
            Self::IntegrityViolation(_) => "integrity_violation",
            Self::Repo(_) => "store_failure",
        }
    }

    /// Whether the caller may retry; nothing was committed in that case.
    pub fn is_retryable(&self) -> bool {
        self.kind() == SwapErrorKind::Infrastructure
    }
}

impl Display for SwapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::SlotNotFound(id) => write!(f, "slot not found: {id}"),
            Self::ProposalNotFound(id) => write!(f, "proposal not found: {id}"),
            Self::OwnershipMismatch { slot, owner, actor } => write!(
                f,
                "slot {slot} is owned by {owner}, not by proposer {actor}"
            ),
            Self::SelfSwap {
                offered_slot,
                requested_slot,
            } => write!(
                f,
                "cannot swap slot {offered_slot} for {requested_slot}: both sides belong to the proposer"
            ),
            Self::NotExchangeable { slot, state } => {
                write!(f, "slot {slot} is `{state}`, not exchangeable")
            }
            Self::Conflict {
                slot,
                proposal: Some(proposal),
            } => write!(f, "slot {slot} is already in open proposal {proposal}"),
            Self::Conflict {
                slot,
                proposal: None,
            } => write!(f, "slot {slot} is already in an open proposal"),
            Self::Unauthorized { proposal, actor } => {
                write!(f, "user {actor} may not resolve proposal {proposal}")
            }
            Self::AlreadyProcessed { proposal, state } => {
                write!(f, "proposal {proposal} was already {state}")
            }
            Self::IntegrityViolation(details) => write!(f, "swap integrity violation: {details}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SwapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SwapError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvalidInput(err.to_string()),
            RepoError::InvalidData(details) => Self::IntegrityViolation(details),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for SwapError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{SwapError, SwapErrorKind};
    use crate::model::proposal::ProposalState;
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn only_store_failures_are_retryable() {
        let busy = SwapError::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(busy.kind(), SwapErrorKind::Infrastructure);
        assert!(busy.is_retryable());

        let processed = SwapError::AlreadyProcessed {
            proposal: Uuid::new_v4(),
            state: ProposalState::Accepted,
        };
        assert_eq!(processed.kind(), SwapErrorKind::StateConflict);
        assert!(!processed.is_retryable());
    }

    #[test]
    fn corrupt_rows_surface_as_integrity_errors() {
        let err = SwapError::from(RepoError::InvalidData("bad state".to_string()));
        assert_eq!(err.kind(), SwapErrorKind::Integrity);
        assert_eq!(err.code(), "integrity_violation");
    }
}
