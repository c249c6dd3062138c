//! Proposal store: repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Own every read and write of proposal rows.
//! - Answer "which open proposal references this slot?" for the conflict
//!   guard and the slot edit guard alike.
//!
//! # Invariants
//! - Proposals are inserted `Open` with `resolved_at = NULL`.
//! - Resolution only applies to rows still `Open`; terminal rows are
//!   additionally protected by a schema trigger.

use crate::model::proposal::{Proposal, ProposalId, ProposalState};
use crate::model::slot::SlotId;
use crate::repo::schema::{ensure_connection_ready, parse_uuid, TableSpec};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

pub(crate) const PROPOSAL_COLUMNS: &[&str] = &[
    "uuid",
    "proposer_uuid",
    "recipient_uuid",
    "offered_slot_uuid",
    "requested_slot_uuid",
    "state",
    "created_at",
    "resolved_at",
];

const PROPOSAL_TABLES: &[TableSpec] = &[("proposals", PROPOSAL_COLUMNS)];

const PROPOSAL_SELECT_SQL: &str = "SELECT
    uuid,
    proposer_uuid,
    recipient_uuid,
    offered_slot_uuid,
    requested_slot_uuid,
    state,
    created_at,
    resolved_at
FROM proposals";

/// Repository interface for proposal persistence.
pub trait ProposalRepository {
    fn insert_proposal(&self, proposal: &Proposal) -> RepoResult<ProposalId>;
    fn get_proposal(&self, id: ProposalId) -> RepoResult<Option<Proposal>>;
    /// Returns the open proposal naming `slot` as offered or requested slot.
    fn find_open_for_slot(&self, slot: SlotId) -> RepoResult<Option<Proposal>>;
    /// Moves an open proposal to a terminal state. Returns `false` when the
    /// row is missing or no longer open.
    fn mark_resolved(
        &self,
        id: ProposalId,
        next: ProposalState,
        resolved_at: i64,
    ) -> RepoResult<bool>;
    /// Counts open proposals referencing `slot`. More than one is corruption.
    fn count_open_for_slot(&self, slot: SlotId) -> RepoResult<u32>;
}

/// SQLite-backed proposal repository.
pub struct SqliteProposalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProposalRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, PROPOSAL_TABLES)?;
        Ok(Self { conn })
    }

    pub(crate) fn unchecked(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProposalRepository for SqliteProposalRepository<'_> {
    fn insert_proposal(&self, proposal: &Proposal) -> RepoResult<ProposalId> {
        if proposal.state != ProposalState::Open || proposal.resolved_at.is_some() {
            return Err(RepoError::InvalidData(format!(
                "new proposal {} must be open and unresolved",
                proposal.uuid
            )));
        }

        self.conn.execute(
            "INSERT INTO proposals (
                uuid,
                proposer_uuid,
                recipient_uuid,
                offered_slot_uuid,
                requested_slot_uuid,
                state,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                proposal.uuid.to_string(),
                proposal.proposer.to_string(),
                proposal.recipient.to_string(),
                proposal.offered_slot.to_string(),
                proposal.requested_slot.to_string(),
                ProposalState::Open.as_str(),
                proposal.created_at,
            ],
        )?;

        Ok(proposal.uuid)
    }

    fn get_proposal(&self, id: ProposalId) -> RepoResult<Option<Proposal>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROPOSAL_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_proposal_row(row)?));
        }
        Ok(None)
    }

    fn find_open_for_slot(&self, slot: SlotId) -> RepoResult<Option<Proposal>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROPOSAL_SELECT_SQL}
             WHERE state = 'open'
               AND (offered_slot_uuid = ?1 OR requested_slot_uuid = ?1)
             ORDER BY created_at ASC, uuid ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([slot.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_proposal_row(row)?));
        }
        Ok(None)
    }

    fn mark_resolved(
        &self,
        id: ProposalId,
        next: ProposalState,
        resolved_at: i64,
    ) -> RepoResult<bool> {
        if !next.is_terminal() {
            return Err(RepoError::InvalidData(format!(
                "proposal {id} cannot be resolved to `{next}`"
            )));
        }

        let changed = self.conn.execute(
            "UPDATE proposals
             SET
                state = ?2,
                resolved_at = ?3
             WHERE uuid = ?1
               AND state = 'open';",
            params![id.to_string(), next.as_str(), resolved_at],
        )?;
        Ok(changed == 1)
    }

    fn count_open_for_slot(&self, slot: SlotId) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM proposals
             WHERE state = 'open'
               AND (offered_slot_uuid = ?1 OR requested_slot_uuid = ?1);",
            [slot.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Decodes one proposal from a row selected with `PROPOSAL_SELECT_SQL`
/// column names, optionally behind a `prefix` alias.
pub(crate) fn parse_proposal_columns(row: &Row<'_>, prefix: &str) -> RepoResult<Proposal> {
    let column = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}_{name}")
        }
    };
    let uuid_at = |name: &str, label: &str| -> RepoResult<uuid::Uuid> {
        let text: String = row.get(column(name).as_str())?;
        parse_uuid(&text, label)
    };

    let state_text: String = row.get(column("state").as_str())?;
    let state = ProposalState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid proposal state `{state_text}` in proposals.state"
        ))
    })?;

    let proposal = Proposal {
        uuid: uuid_at("uuid", "proposals.uuid")?,
        proposer: uuid_at("proposer_uuid", "proposals.proposer_uuid")?,
        recipient: uuid_at("recipient_uuid", "proposals.recipient_uuid")?,
        offered_slot: uuid_at("offered_slot_uuid", "proposals.offered_slot_uuid")?,
        requested_slot: uuid_at("requested_slot_uuid", "proposals.requested_slot_uuid")?,
        state,
        created_at: row.get(column("created_at").as_str())?,
        resolved_at: row.get(column("resolved_at").as_str())?,
    };

    if proposal.state.is_terminal() != proposal.resolved_at.is_some() {
        return Err(RepoError::InvalidData(format!(
            "proposal {} is `{}` but resolved_at is {:?}",
            proposal.uuid, proposal.state, proposal.resolved_at
        )));
    }
    Ok(proposal)
}

fn parse_proposal_row(row: &Row<'_>) -> RepoResult<Proposal> {
    parse_proposal_columns(row, "")
}
