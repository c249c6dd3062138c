//! User projection repository.
//!
//! # Responsibility
//! - Let the identity collaborator register or refresh user profiles.
//! - Resolve profiles for owner/counterpart embedding on read views.

use crate::model::user::{UserId, UserProfile};
use crate::repo::schema::{ensure_connection_ready, parse_uuid, TableSpec};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const USER_TABLES: &[TableSpec] = &[("users", &["uuid", "display_name", "email"])];

/// Repository interface for user profiles.
pub trait UserRepository {
    /// Inserts or refreshes one profile keyed by its id.
    fn upsert_user(&self, user: &UserProfile) -> RepoResult<()>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<UserProfile>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, USER_TABLES)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn upsert_user(&self, user: &UserProfile) -> RepoResult<()> {
        if user.display_name.trim().is_empty() {
            return Err(RepoError::InvalidData(format!(
                "user {} has a blank display name",
                user.uuid
            )));
        }

        self.conn.execute(
            "INSERT INTO users (uuid, display_name, email)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (uuid) DO UPDATE SET
                display_name = excluded.display_name,
                email = excluded.email;",
            params![
                user.uuid.to_string(),
                user.display_name.trim(),
                user.email.as_deref()
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<UserProfile>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, display_name, email FROM users WHERE uuid = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_columns(row, "uuid", "display_name", "email")?));
        }
        Ok(None)
    }
}

/// Decodes a user profile from aliased columns of a joined row.
pub(crate) fn parse_user_columns(
    row: &Row<'_>,
    uuid_column: &str,
    name_column: &str,
    email_column: &str,
) -> RepoResult<UserProfile> {
    let uuid_text: String = row.get(uuid_column)?;
    Ok(UserProfile {
        uuid: parse_uuid(&uuid_text, "users.uuid")?,
        display_name: row.get(name_column)?,
        email: row.get(email_column)?,
    })
}
