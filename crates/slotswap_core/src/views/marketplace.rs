//! Exchangeable slot marketplace listing.

use crate::model::slot::Slot;
use crate::model::user::{UserId, UserProfile};
use crate::repo::slot_repo::parse_slot_columns;
use crate::repo::user_repo::parse_user_columns;
use crate::repo::RepoResult;
use rusqlite::Connection;
use serde::Serialize;

/// One exchangeable slot with its owner's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSlot {
    pub slot: Slot,
    pub owner: UserProfile,
}

/// Lists every `Exchangeable` slot not owned by `requester`, soonest first.
pub fn list_exchangeable_slots(conn: &Connection, requester: UserId) -> RepoResult<Vec<MarketSlot>> {
    let mut stmt = conn.prepare(
        "SELECT
            s.uuid AS uuid,
            s.owner_uuid AS owner_uuid,
            s.title AS title,
            s.start_at AS start_at,
            s.end_at AS end_at,
            s.state AS state,
            u.uuid AS user_uuid,
            u.display_name AS user_display_name,
            u.email AS user_email
         FROM slots s
         INNER JOIN users u ON u.uuid = s.owner_uuid
         WHERE s.state = 'exchangeable'
           AND s.owner_uuid <> ?1
         ORDER BY s.start_at ASC, s.uuid ASC;",
    )?;
    let mut rows = stmt.query([requester.to_string()])?;
    let mut listing = Vec::new();
    while let Some(row) = rows.next()? {
        listing.push(MarketSlot {
            slot: parse_slot_columns(row, "")?,
            owner: parse_user_columns(row, "user_uuid", "user_display_name", "user_email")?,
        });
    }
    Ok(listing)
}
