//! Slot store: repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Own every read and write of slot rows.
//! - Expose compare-and-set state writes used by the swap engine.
//!
//! # Invariants
//! - Write paths call `Slot::validate()` before SQL mutations.
//! - New slots are always persisted `Ordinary`.
//! - State and ownership changes only apply when the expected prior state (and
//!   owner) still hold; the caller decides what a miss means.

use crate::model::slot::{Slot, SlotId, SlotState};
use crate::model::user::UserId;
use crate::repo::schema::{ensure_connection_ready, parse_uuid, TableSpec};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

pub(crate) const SLOT_COLUMNS: &[&str] = &[
    "uuid",
    "owner_uuid",
    "title",
    "start_at",
    "end_at",
    "state",
    "updated_at",
];

const SLOT_TABLES: &[TableSpec] = &[("slots", SLOT_COLUMNS)];

const SLOT_SELECT_SQL: &str = "SELECT
    uuid,
    owner_uuid,
    title,
    start_at,
    end_at,
    state
FROM slots";

/// Repository interface for slot persistence.
pub trait SlotRepository {
    fn create_slot(&self, slot: &Slot) -> RepoResult<SlotId>;
    fn get_slot(&self, id: SlotId) -> RepoResult<Option<Slot>>;
    /// Lists one owner's slots ordered by start time.
    fn list_slots_by_owner(&self, owner: UserId) -> RepoResult<Vec<Slot>>;
    /// Replaces title and time range; owner and state are untouched.
    fn update_schedule(&self, slot: &Slot) -> RepoResult<()>;
    /// Moves a slot from `expected` to `next`. Returns `false` when the row is
    /// missing or not in `expected`.
    fn compare_and_set_state(
        &self,
        id: SlotId,
        expected: SlotState,
        next: SlotState,
    ) -> RepoResult<bool>;
    /// Reassigns owner and state in one write. Returns `false` unless the row
    /// is currently owned by `from` and in `expected`.
    fn transfer_ownership(
        &self,
        id: SlotId,
        from: UserId,
        to: UserId,
        expected: SlotState,
        next: SlotState,
    ) -> RepoResult<bool>;
    fn delete_slot(&self, id: SlotId) -> RepoResult<()>;
}

/// SQLite-backed slot repository.
pub struct SqliteSlotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSlotRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, SLOT_TABLES)?;
        Ok(Self { conn })
    }

    /// Wraps a connection (usually a transaction) already checked by a caller.
    pub(crate) fn unchecked(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SlotRepository for SqliteSlotRepository<'_> {
    fn create_slot(&self, slot: &Slot) -> RepoResult<SlotId> {
        slot.validate()?;
        if slot.state != SlotState::Ordinary {
            return Err(RepoError::InvalidData(format!(
                "new slot {} must be ordinary, got {}",
                slot.uuid, slot.state
            )));
        }

        self.conn.execute(
            "INSERT INTO slots (
                uuid,
                owner_uuid,
                title,
                start_at,
                end_at,
                state
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                slot.uuid.to_string(),
                slot.owner.to_string(),
                slot.title.as_str(),
                slot.start_at,
                slot.end_at,
                SlotState::Ordinary.as_str(),
            ],
        )?;

        Ok(slot.uuid)
    }

    fn get_slot(&self, id: SlotId) -> RepoResult<Option<Slot>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SLOT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_slot_row(row)?));
        }
        Ok(None)
    }

    fn list_slots_by_owner(&self, owner: UserId) -> RepoResult<Vec<Slot>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SLOT_SELECT_SQL}
             WHERE owner_uuid = ?1
             ORDER BY start_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([owner.to_string()])?;
        let mut slots = Vec::new();
        while let Some(row) = rows.next()? {
            slots.push(parse_slot_row(row)?);
        }
        Ok(slots)
    }

    fn update_schedule(&self, slot: &Slot) -> RepoResult<()> {
        slot.validate()?;

        let changed = self.conn.execute(
            "UPDATE slots
             SET
                title = ?2,
                start_at = ?3,
                end_at = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                slot.uuid.to_string(),
                slot.title.as_str(),
                slot.start_at,
                slot.end_at,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("slot", slot.uuid));
        }
        Ok(())
    }

    fn compare_and_set_state(
        &self,
        id: SlotId,
        expected: SlotState,
        next: SlotState,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE slots
             SET
                state = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND state = ?2;",
            params![id.to_string(), expected.as_str(), next.as_str()],
        )?;
        Ok(changed == 1)
    }

    fn transfer_ownership(
        &self,
        id: SlotId,
        from: UserId,
        to: UserId,
        expected: SlotState,
        next: SlotState,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE slots
             SET
                owner_uuid = ?3,
                state = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND owner_uuid = ?2
               AND state = ?4;",
            params![
                id.to_string(),
                from.to_string(),
                to.to_string(),
                expected.as_str(),
                next.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    fn delete_slot(&self, id: SlotId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM slots WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("slot", id));
        }
        Ok(())
    }
}

/// Decodes one slot from a row selected with the plain `slots` column names,
/// optionally behind a `prefix` alias (`offered_uuid`, `offered_title`, ...).
pub(crate) fn parse_slot_columns(row: &Row<'_>, prefix: &str) -> RepoResult<Slot> {
    let column = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}_{name}")
        }
    };

    let uuid_text: String = row.get(column("uuid").as_str())?;
    let uuid = parse_uuid(&uuid_text, "slots.uuid")?;
    let owner_text: String = row.get(column("owner_uuid").as_str())?;
    let owner = parse_uuid(&owner_text, "slots.owner_uuid")?;

    let state_text: String = row.get(column("state").as_str())?;
    let state = SlotState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid slot state `{state_text}` in slots.state"))
    })?;

    let slot = Slot {
        uuid,
        owner,
        title: row.get(column("title").as_str())?,
        start_at: row.get(column("start_at").as_str())?,
        end_at: row.get(column("end_at").as_str())?,
        state,
    };
    slot.validate().map_err(|err| {
        RepoError::InvalidData(format!("stored slot {uuid} fails validation: {err}"))
    })?;
    Ok(slot)
}

fn parse_slot_row(row: &Row<'_>) -> RepoResult<Slot> {
    parse_slot_columns(row, "")
}
