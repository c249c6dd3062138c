use rusqlite::Connection;
use slotswap_core::db::migrations::latest_version;
use slotswap_core::db::{open_db, open_db_in_memory, DbError};
use slotswap_core::{RepoError, SqliteSlotRepository, SwapService};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "users");
    assert_table_exists(&conn, "slots");
    assert_table_exists(&conn, "proposals");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slotswap.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "proposals");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn engine_rejects_uninitialized_connection() {
    let mut conn = Connection::open_in_memory().unwrap();

    match SwapService::try_new(&mut conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_slots_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteSlotRepository::try_new(&conn);
    assert!(matches!(result, Err(RepoError::MissingRequiredTable("slots"))));
}

#[test]
fn schema_refuses_open_proposal_on_same_slot_twice() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO users (uuid, display_name) VALUES ('u1', 'One'), ('u2', 'Two'), ('u3', 'Three');
         INSERT INTO slots (uuid, owner_uuid, title, start_at, end_at, state) VALUES
            ('a', 'u1', 'A', 0, 10, 'pending_exchange'),
            ('b', 'u2', 'B', 0, 10, 'pending_exchange'),
            ('c', 'u3', 'C', 0, 10, 'exchangeable');
         INSERT INTO proposals (uuid, proposer_uuid, recipient_uuid, offered_slot_uuid, requested_slot_uuid, created_at)
            VALUES ('p1', 'u1', 'u2', 'a', 'b', 1);",
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO proposals (uuid, proposer_uuid, recipient_uuid, offered_slot_uuid, requested_slot_uuid, created_at)
         VALUES ('p2', 'u3', 'u2', 'c', 'b', 2);",
        [],
    );
    assert!(duplicate.is_err());
}

#[test]
fn schema_refuses_slot_offered_and_requested_by_two_open_proposals() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO users (uuid, display_name) VALUES ('u1', 'One'), ('u2', 'Two'), ('u3', 'Three');
         INSERT INTO slots (uuid, owner_uuid, title, start_at, end_at, state) VALUES
            ('a', 'u1', 'A', 0, 10, 'pending_exchange'),
            ('b', 'u2', 'B', 0, 10, 'pending_exchange'),
            ('c', 'u3', 'C', 0, 10, 'exchangeable');
         INSERT INTO proposals (uuid, proposer_uuid, recipient_uuid, offered_slot_uuid, requested_slot_uuid, created_at)
            VALUES ('p1', 'u1', 'u2', 'a', 'b', 1);",
    )
    .unwrap();

    let requested_elsewhere = conn.execute(
        "INSERT INTO proposals (uuid, proposer_uuid, recipient_uuid, offered_slot_uuid, requested_slot_uuid, created_at)
         VALUES ('p2', 'u3', 'u1', 'c', 'a', 2);",
        [],
    );
    assert!(requested_elsewhere.is_err());

    let offered_elsewhere = conn.execute(
        "INSERT INTO proposals (uuid, proposer_uuid, recipient_uuid, offered_slot_uuid, requested_slot_uuid, created_at)
         VALUES ('p3', 'u2', 'u3', 'b', 'c', 3);",
        [],
    );
    assert!(offered_elsewhere.is_err());

    conn.execute_batch(
        "UPDATE proposals SET state = 'rejected', resolved_at = 4 WHERE uuid = 'p1';
         INSERT INTO proposals (uuid, proposer_uuid, recipient_uuid, offered_slot_uuid, requested_slot_uuid, created_at)
            VALUES ('p4', 'u3', 'u1', 'c', 'a', 5);",
    )
    .unwrap();
}

#[test]
fn schema_keeps_resolved_proposals_immutable() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO users (uuid, display_name) VALUES ('u1', 'One'), ('u2', 'Two');
         INSERT INTO slots (uuid, owner_uuid, title, start_at, end_at) VALUES
            ('a', 'u1', 'A', 0, 10),
            ('b', 'u2', 'B', 0, 10);
         INSERT INTO proposals (uuid, proposer_uuid, recipient_uuid, offered_slot_uuid, requested_slot_uuid, state, created_at, resolved_at)
            VALUES ('p1', 'u1', 'u2', 'a', 'b', 'rejected', 1, 2);",
    )
    .unwrap();

    let reopen = conn.execute(
        "UPDATE proposals SET state = 'open', resolved_at = NULL WHERE uuid = 'p1';",
        [],
    );
    assert!(reopen.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
