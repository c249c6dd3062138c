//! Proposal detail and inbox views.
//!
//! # Invariants
//! - Incoming and outgoing lists are ordered newest first; proposals created
//!   in the same millisecond keep reverse insertion order.
//! - Embedded slots reflect their current owner and state.

use crate::model::proposal::{Proposal, ProposalId};
use crate::model::slot::Slot;
use crate::model::user::{UserId, UserProfile};
use crate::repo::proposal_repo::parse_proposal_columns;
use crate::repo::slot_repo::parse_slot_columns;
use crate::repo::user_repo::parse_user_columns;
use crate::repo::RepoResult;
use rusqlite::{Connection, Row};
use serde::Serialize;

const PROPOSAL_DETAIL_SELECT_SQL: &str = "SELECT
    p.uuid AS p_uuid,
    p.proposer_uuid AS p_proposer_uuid,
    p.recipient_uuid AS p_recipient_uuid,
    p.offered_slot_uuid AS p_offered_slot_uuid,
    p.requested_slot_uuid AS p_requested_slot_uuid,
    p.state AS p_state,
    p.created_at AS p_created_at,
    p.resolved_at AS p_resolved_at,
    os.uuid AS offered_uuid,
    os.owner_uuid AS offered_owner_uuid,
    os.title AS offered_title,
    os.start_at AS offered_start_at,
    os.end_at AS offered_end_at,
    os.state AS offered_state,
    rs.uuid AS requested_uuid,
    rs.owner_uuid AS requested_owner_uuid,
    rs.title AS requested_title,
    rs.start_at AS requested_start_at,
    rs.end_at AS requested_end_at,
    rs.state AS requested_state,
    pu.uuid AS proposer_uuid,
    pu.display_name AS proposer_display_name,
    pu.email AS proposer_email,
    ru.uuid AS recipient_uuid,
    ru.display_name AS recipient_display_name,
    ru.email AS recipient_email
FROM proposals p
INNER JOIN slots os ON os.uuid = p.offered_slot_uuid
INNER JOIN slots rs ON rs.uuid = p.requested_slot_uuid
INNER JOIN users pu ON pu.uuid = p.proposer_uuid
INNER JOIN users ru ON ru.uuid = p.recipient_uuid";

/// A proposal with both slots and both parties resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposalDetail {
    pub proposal: Proposal,
    pub offered_slot: Slot,
    pub requested_slot: Slot,
    pub proposer: UserProfile,
    pub recipient: UserProfile,
}

impl ProposalDetail {
    /// The party opposite `user`, or `None` when `user` is not a party.
    pub fn counterpart(&self, user: UserId) -> Option<&UserProfile> {
        if user == self.proposal.proposer {
            Some(&self.recipient)
        } else if user == self.proposal.recipient {
            Some(&self.proposer)
        } else {
            None
        }
    }
}

/// One user's proposals split by direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProposalInbox {
    /// The user is the recipient.
    pub incoming: Vec<ProposalDetail>,
    /// The user is the proposer.
    pub outgoing: Vec<ProposalDetail>,
}

/// Loads one proposal with embedded detail.
pub fn load_proposal_detail(conn: &Connection, id: ProposalId) -> RepoResult<Option<ProposalDetail>> {
    let mut stmt = conn.prepare(&format!("{PROPOSAL_DETAIL_SELECT_SQL} WHERE p.uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_detail_row(row)?));
    }
    Ok(None)
}

/// Lists incoming and outgoing proposals for `user`.
pub fn list_proposals(conn: &Connection, user: UserId) -> RepoResult<ProposalInbox> {
    Ok(ProposalInbox {
        incoming: list_by_party(conn, "p.recipient_uuid", user)?,
        outgoing: list_by_party(conn, "p.proposer_uuid", user)?,
    })
}

fn list_by_party(
    conn: &Connection,
    party_column: &'static str,
    user: UserId,
) -> RepoResult<Vec<ProposalDetail>> {
    let mut stmt = conn.prepare(&format!(
        "{PROPOSAL_DETAIL_SELECT_SQL}
         WHERE {party_column} = ?1
         ORDER BY p.created_at DESC, p.rowid DESC;"
    ))?;
    let mut rows = stmt.query([user.to_string()])?;
    let mut details = Vec::new();
    while let Some(row) = rows.next()? {
        details.push(parse_detail_row(row)?);
    }
    Ok(details)
}

fn parse_detail_row(row: &Row<'_>) -> RepoResult<ProposalDetail> {
    Ok(ProposalDetail {
        proposal: parse_proposal_columns(row, "p")?,
        offered_slot: parse_slot_columns(row, "offered")?,
        requested_slot: parse_slot_columns(row, "requested")?,
        proposer: parse_user_columns(row, "proposer_uuid", "proposer_display_name", "proposer_email")?,
        recipient: parse_user_columns(
            row,
            "recipient_uuid",
            "recipient_display_name",
            "recipient_email",
        )?,
    })
}
