//! Swap negotiation engine.
//!
//! # Responsibility
//! - Create proposals: eligibility, conflict guard, then the writes.
//! - Resolve proposals: move the proposal and both slots in one unit.
//! - Serve the marketplace and proposal inbox read views.
//!
//! # Invariants
//! - Creation and resolution each run in one `BEGIN IMMEDIATE` transaction;
//!   any error drops the transaction, so no partial state is committed.
//! - A slot is `PendingExchange` iff exactly one open proposal references it.
//! - Only the recorded recipient resolves, and only while `Open`.
//! - Accepting exchanges ownership; titles and time ranges stay on their slot.

use crate::model::proposal::{Decision, Proposal, ProposalId};
use crate::model::slot::{SlotId, SlotState};
use crate::model::user::UserId;
use crate::repo::proposal_repo::{ProposalRepository, SqliteProposalRepository, PROPOSAL_COLUMNS};
use crate::repo::schema::{ensure_connection_ready, now_epoch_ms, TableSpec};
use crate::repo::slot_repo::{SlotRepository, SqliteSlotRepository, SLOT_COLUMNS};
use crate::repo::RepoResult;
use crate::service::conflict_guard::{attach_holder, ensure_slots_free};
use crate::service::eligibility::check_eligibility;
use crate::service::swap_error::{SwapError, SwapResult};
use crate::views::marketplace::{list_exchangeable_slots, MarketSlot};
use crate::views::proposals::{list_proposals, load_proposal_detail, ProposalDetail, ProposalInbox};
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

const ENGINE_TABLES: &[TableSpec] = &[
    ("users", &["uuid", "display_name", "email"]),
    ("slots", SLOT_COLUMNS),
    ("proposals", PROPOSAL_COLUMNS),
];

/// Engine facade bound to one request handler's connection.
pub struct SwapService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SwapService<'conn> {
    /// Constructs the engine from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, ENGINE_TABLES)?;
        Ok(Self { conn })
    }

    /// Lists exchangeable slots owned by anyone except `requester`.
    pub fn list_exchangeable_slots(&self, requester: UserId) -> SwapResult<Vec<MarketSlot>> {
        Ok(list_exchangeable_slots(&*self.conn, requester)?)
    }

    /// Lists `user`'s incoming and outgoing proposals, newest first.
    pub fn list_proposals(&self, user: UserId) -> SwapResult<ProposalInbox> {
        Ok(list_proposals(&*self.conn, user)?)
    }

    /// Gets one proposal visible to `user` as proposer or recipient.
    ///
    /// Proposals of other users are reported as not found.
    pub fn get_proposal(&self, user: UserId, id: ProposalId) -> SwapResult<ProposalDetail> {
        match load_proposal_detail(&*self.conn, id)? {
            Some(detail) if detail.proposal.is_party(user) => Ok(detail),
            _ => Err(SwapError::ProposalNotFound(id)),
        }
    }

    /// Offers `offered_slot` (owned by `proposer`) in exchange for
    /// `requested_slot`.
    ///
    /// # Errors
    /// - `SelfSwap`, `SlotNotFound`, `OwnershipMismatch`, `NotExchangeable`
    ///   from eligibility.
    /// - `Conflict` when either slot is already held by an open proposal.
    pub fn create_proposal(
        &mut self,
        proposer: UserId,
        offered_slot: SlotId,
        requested_slot: SlotId,
    ) -> SwapResult<ProposalDetail> {
        let started_at = Instant::now();
        let result = self.create_proposal_in_tx(proposer, offered_slot, requested_slot);
        match &result {
            Ok(detail) => info!(
                "event=proposal_create module=swap status=ok proposal={} offered={} requested={} duration_ms={}",
                detail.proposal.uuid,
                offered_slot,
                requested_slot,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=proposal_create module=swap status=rejected offered={} requested={} duration_ms={} error_code={} error={}",
                offered_slot,
                requested_slot,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
        result
    }

    /// Accepts (`accept = true`) or rejects an open proposal as its recipient.
    ///
    /// # Errors
    /// - `ProposalNotFound` for unknown ids.
    /// - `Unauthorized` when `recipient` is not the recorded recipient.
    /// - `AlreadyProcessed` when the proposal is no longer open.
    pub fn resolve_proposal(
        &mut self,
        recipient: UserId,
        proposal_id: ProposalId,
        accept: bool,
    ) -> SwapResult<ProposalDetail> {
        let started_at = Instant::now();
        let decision = Decision::from_accept(accept);
        let result = self.resolve_proposal_in_tx(recipient, proposal_id, decision);
        match &result {
            Ok(detail) => info!(
                "event=proposal_resolve module=swap status=ok proposal={} decision={} state={} duration_ms={}",
                proposal_id,
                decision.as_str(),
                detail.proposal.state,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=proposal_resolve module=swap status=rejected proposal={} decision={} duration_ms={} error_code={} error={}",
                proposal_id,
                decision.as_str(),
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
        result
    }

    fn create_proposal_in_tx(
        &mut self,
        proposer: UserId,
        offered_id: SlotId,
        requested_id: SlotId,
    ) -> SwapResult<ProposalDetail> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let slots = SqliteSlotRepository::unchecked(&tx);
        let proposals = SqliteProposalRepository::unchecked(&tx);

        let offered = slots.get_slot(offered_id)?;
        let requested = slots.get_slot(requested_id)?;
        let pair = check_eligibility(
            proposer,
            offered_id,
            requested_id,
            offered.as_ref(),
            requested.as_ref(),
        )
        .map_err(|err| attach_holder(&proposals, err))?;

        ensure_slots_free(&proposals, &[offered_id, requested_id])?;

        let proposal = Proposal::open(
            proposer,
            pair.recipient(),
            offered_id,
            requested_id,
            now_epoch_ms(),
        );
        proposals.insert_proposal(&proposal)?;

        for slot in [offered_id, requested_id] {
            if !slots.compare_and_set_state(
                slot,
                SlotState::Exchangeable,
                SlotState::PendingExchange,
            )? {
                return Err(SwapError::IntegrityViolation(format!(
                    "slot {slot} changed while proposal {} was being created",
                    proposal.uuid
                )));
            }
        }

        commit_with_detail(tx, proposal.uuid)
    }

    fn resolve_proposal_in_tx(
        &mut self,
        actor: UserId,
        proposal_id: ProposalId,
        decision: Decision,
    ) -> SwapResult<ProposalDetail> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let slots = SqliteSlotRepository::unchecked(&tx);
        let proposals = SqliteProposalRepository::unchecked(&tx);

        let proposal = proposals
            .get_proposal(proposal_id)?
            .ok_or(SwapError::ProposalNotFound(proposal_id))?;

        if proposal.recipient != actor {
            return Err(SwapError::Unauthorized {
                proposal: proposal_id,
                actor,
            });
        }

        let Some(next_state) = proposal.state.resolve(decision) else {
            return Err(SwapError::AlreadyProcessed {
                proposal: proposal_id,
                state: proposal.state,
            });
        };

        if !proposals.mark_resolved(proposal_id, next_state, now_epoch_ms())? {
            return Err(SwapError::IntegrityViolation(format!(
                "proposal {proposal_id} left the open state mid-resolution"
            )));
        }

        apply_slot_resolution(&slots, &proposal, decision)?;

        commit_with_detail(tx, proposal_id)
    }
}

/// Moves both slots of `proposal` out of `PendingExchange`.
fn apply_slot_resolution<R: SlotRepository>(
    slots: &R,
    proposal: &Proposal,
    decision: Decision,
) -> SwapResult<()> {
    let next = SlotState::after_resolution(decision);
    let legs = [
        (proposal.offered_slot, proposal.proposer, proposal.recipient),
        (proposal.requested_slot, proposal.recipient, proposal.proposer),
    ];

    for (slot, from, to) in legs {
        let applied = match decision {
            Decision::Accept => {
                slots.transfer_ownership(slot, from, to, SlotState::PendingExchange, next)?
            }
            Decision::Reject => {
                slots.compare_and_set_state(slot, SlotState::PendingExchange, next)?
            }
        };
        if !applied {
            return Err(SwapError::IntegrityViolation(format!(
                "slot {slot} of proposal {} is not pending under owner {from}",
                proposal.uuid
            )));
        }
    }
    Ok(())
}

fn commit_with_detail(tx: Transaction<'_>, proposal_id: ProposalId) -> SwapResult<ProposalDetail> {
    let detail = load_proposal_detail(&tx, proposal_id)?.ok_or_else(|| {
        SwapError::IntegrityViolation(format!(
            "proposal {proposal_id} not found in read-back"
        ))
    })?;
    tx.commit()?;
    Ok(detail)
}
