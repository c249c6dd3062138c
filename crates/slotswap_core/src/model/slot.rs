//! Calendar slot domain model.
//!
//! # Responsibility
//! - Define the slot record and its exchange-eligibility state machine.
//! - Validate schedule fields before persistence.
//!
//! # Invariants
//! - `start_at` strictly precedes `end_at`.
//! - Slots are created `Ordinary`; only proposal creation moves a slot to
//!   `PendingExchange` and only resolution moves it out again.

use crate::model::proposal::Decision;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a calendar slot.
pub type SlotId = Uuid;

/// Exchange eligibility of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// Plain calendar entry, not offered for swapping.
    Ordinary,
    /// Opted into the marketplace by its owner.
    Exchangeable,
    /// Referenced by exactly one open proposal.
    PendingExchange,
}

impl SlotState {
    /// Stable storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ordinary => "ordinary",
            Self::Exchangeable => "exchangeable",
            Self::PendingExchange => "pending_exchange",
        }
    }

    /// Parses a storage value; `None` for anything unknown.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ordinary" => Some(Self::Ordinary),
            "exchangeable" => Some(Self::Exchangeable),
            "pending_exchange" => Some(Self::PendingExchange),
            _ => None,
        }
    }

    /// Whether plain CRUD may edit, delete or toggle a slot in this state.
    pub fn is_editable(self) -> bool {
        match self {
            Self::Ordinary | Self::Exchangeable => true,
            Self::PendingExchange => false,
        }
    }

    /// State a pending slot lands in once its proposal is resolved.
    pub fn after_resolution(decision: Decision) -> Self {
        match decision {
            Decision::Accept => Self::Ordinary,
            Decision::Reject => Self::Exchangeable,
        }
    }
}

impl Display for SlotState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schedule validation failures for slot writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValidationError {
    /// Title is empty after trim.
    BlankTitle,
    /// `start_at` does not strictly precede `end_at`.
    InvalidTimeRange { start_at: i64, end_at: i64 },
}

impl Display for SlotValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "slot title must not be blank"),
            Self::InvalidTimeRange { start_at, end_at } => write!(
                f,
                "slot start ({start_at}) must be strictly before end ({end_at})"
            ),
        }
    }
}

impl Error for SlotValidationError {}

/// One user's calendar slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub uuid: SlotId,
    pub owner: UserId,
    pub title: String,
    /// Unix epoch milliseconds.
    pub start_at: i64,
    /// Unix epoch milliseconds, exclusive.
    pub end_at: i64,
    pub state: SlotState,
}

impl Slot {
    /// Creates a new `Ordinary` slot with a generated id.
    pub fn new(
        owner: UserId,
        title: impl Into<String>,
        start_at: i64,
        end_at: i64,
    ) -> Result<Self, SlotValidationError> {
        let slot = Self {
            uuid: Uuid::new_v4(),
            owner,
            title: title.into().trim().to_string(),
            start_at,
            end_at,
            state: SlotState::Ordinary,
        };
        slot.validate()?;
        Ok(slot)
    }

    /// Checks schedule fields.
    pub fn validate(&self) -> Result<(), SlotValidationError> {
        if self.title.trim().is_empty() {
            return Err(SlotValidationError::BlankTitle);
        }
        if self.start_at >= self.end_at {
            return Err(SlotValidationError::InvalidTimeRange {
                start_at: self.start_at,
                end_at: self.end_at,
            });
        }
        Ok(())
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == user
    }
}
