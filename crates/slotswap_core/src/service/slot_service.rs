//! Slot use-case service for the CRUD/import collaborators.
//!
//! # Responsibility
//! - Create, edit, delete and list slots on behalf of their owner.
//! - Toggle a slot between `Ordinary` and `Exchangeable`.
//!
//! # Invariants
//! - Only the owner may mutate a slot.
//! - A slot held by an open proposal is never edited, deleted or toggled; the
//!   hold is detected with the conflict guard's lookup.
//! - Every mutation runs under `BEGIN IMMEDIATE` so it serializes with
//!   proposal creation.

use crate::model::proposal::ProposalId;
use crate::model::slot::{Slot, SlotId, SlotState, SlotValidationError};
use crate::model::user::UserId;
use crate::repo::proposal_repo::{ProposalRepository, SqliteProposalRepository, PROPOSAL_COLUMNS};
use crate::repo::schema::{ensure_connection_ready, TableSpec};
use crate::repo::slot_repo::{SlotRepository, SqliteSlotRepository, SLOT_COLUMNS};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::conflict_guard::open_proposal_for_slot;
use log::info;
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SLOT_SERVICE_TABLES: &[TableSpec] = &[
    ("users", &["uuid", "display_name", "email"]),
    ("slots", SLOT_COLUMNS),
    ("proposals", PROPOSAL_COLUMNS),
];

/// Errors from slot CRUD operations.
#[derive(Debug)]
pub enum SlotServiceError {
    Validation(SlotValidationError),
    SlotNotFound(SlotId),
    /// Owner id is not known to the identity projection.
    UnknownOwner(UserId),
    /// Actor does not own the slot.
    NotOwner { slot: SlotId, actor: UserId },
    /// Slot is pending exchange; `proposal` is the open proposal holding it.
    SlotLocked {
        slot: SlotId,
        proposal: Option<ProposalId>,
    },
    Repo(RepoError),
}

impl Display for SlotServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::SlotNotFound(id) => write!(f, "slot not found: {id}"),
            Self::UnknownOwner(id) => write!(f, "unknown slot owner: {id}"),
            Self::NotOwner { slot, actor } => {
                write!(f, "user {actor} does not own slot {slot}")
            }
            Self::SlotLocked {
                slot,
                proposal: Some(proposal),
            } => write!(f, "slot {slot} is held by open proposal {proposal}"),
            Self::SlotLocked {
                slot,
                proposal: None,
            } => write!(f, "slot {slot} is pending exchange"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SlotServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SlotServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "slot",
                id,
            } => Self::SlotNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<SlotValidationError> for SlotServiceError {
    fn from(value: SlotValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for SlotServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Slot CRUD facade bound to one connection.
pub struct SlotService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SlotService<'conn> {
    /// Constructs the service from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, SLOT_SERVICE_TABLES)?;
        Ok(Self { conn })
    }

    /// Creates one `Ordinary` slot for `owner`.
    pub fn create_slot(
        &mut self,
        owner: UserId,
        title: impl Into<String>,
        start_at: i64,
        end_at: i64,
    ) -> Result<Slot, SlotServiceError> {
        let slot = Slot::new(owner, title, start_at, end_at)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if SqliteUserRepository::try_new(&tx)?.get_user(owner)?.is_none() {
            return Err(SlotServiceError::UnknownOwner(owner));
        }
        SqliteSlotRepository::unchecked(&tx).create_slot(&slot)?;
        tx.commit()?;

        info!(
            "event=slot_create module=slot status=ok slot={} owner={}",
            slot.uuid, owner
        );
        Ok(slot)
    }

    pub fn get_slot(&self, id: SlotId) -> Result<Option<Slot>, SlotServiceError> {
        Ok(SqliteSlotRepository::unchecked(&*self.conn).get_slot(id)?)
    }

    /// Lists `owner`'s slots ordered by start time.
    pub fn list_owned_slots(&self, owner: UserId) -> Result<Vec<Slot>, SlotServiceError> {
        Ok(SqliteSlotRepository::unchecked(&*self.conn).list_slots_by_owner(owner)?)
    }

    /// Opts a slot into (`true`) or out of (`false`) the marketplace.
    ///
    /// Setting the state the slot already has is a no-op.
    pub fn set_exchangeable(
        &mut self,
        actor: UserId,
        id: SlotId,
        exchangeable: bool,
    ) -> Result<Slot, SlotServiceError> {
        let target = if exchangeable {
            SlotState::Exchangeable
        } else {
            SlotState::Ordinary
        };

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let slots = SqliteSlotRepository::unchecked(&tx);
        let mut slot = load_editable(&slots, &SqliteProposalRepository::unchecked(&tx), actor, id)?;

        if slot.state != target {
            if !slots.compare_and_set_state(id, slot.state, target)? {
                return Err(SlotServiceError::Repo(RepoError::InvalidData(format!(
                    "slot {id} changed state under write lock"
                ))));
            }
            slot.state = target;
        }
        tx.commit()?;

        info!(
            "event=slot_set_state module=slot status=ok slot={} state={}",
            id, slot.state
        );
        Ok(slot)
    }

    /// Replaces title and time range of an editable slot.
    pub fn update_slot(
        &mut self,
        actor: UserId,
        id: SlotId,
        title: impl Into<String>,
        start_at: i64,
        end_at: i64,
    ) -> Result<Slot, SlotServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let slots = SqliteSlotRepository::unchecked(&tx);
        let current = load_editable(&slots, &SqliteProposalRepository::unchecked(&tx), actor, id)?;

        let updated = Slot {
            title: title.into().trim().to_string(),
            start_at,
            end_at,
            ..current
        };
        updated.validate()?;
        slots.update_schedule(&updated)?;
        tx.commit()?;

        info!("event=slot_update module=slot status=ok slot={id}");
        Ok(updated)
    }

    /// Deletes an editable slot together with its resolved proposal history.
    pub fn delete_slot(&mut self, actor: UserId, id: SlotId) -> Result<(), SlotServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let slots = SqliteSlotRepository::unchecked(&tx);
        load_editable(&slots, &SqliteProposalRepository::unchecked(&tx), actor, id)?;
        slots.delete_slot(id)?;
        tx.commit()?;

        info!("event=slot_delete module=slot status=ok slot={id}");
        Ok(())
    }
}

/// Loads a slot and checks the actor may mutate it right now.
fn load_editable<S, P>(
    slots: &S,
    proposals: &P,
    actor: UserId,
    id: SlotId,
) -> Result<Slot, SlotServiceError>
where
    S: SlotRepository,
    P: ProposalRepository,
{
    let slot = slots
        .get_slot(id)?
        .ok_or(SlotServiceError::SlotNotFound(id))?;
    if !slot.is_owned_by(actor) {
        return Err(SlotServiceError::NotOwner { slot: id, actor });
    }

    let holder = open_proposal_for_slot(proposals, id)?;
    if !slot.state.is_editable() || holder.is_some() {
        return Err(SlotServiceError::SlotLocked {
            slot: id,
            proposal: holder.map(|proposal| proposal.uuid),
        });
    }
    Ok(slot)
}
