//! Position store: term id -> custom integer position.
//!
//! # Invariants
//! - `set_position` is an idempotent upsert.
//! - Positions are never deleted; a removed term leaves an orphan row that no
//!   listing joins against.

use crate::model::term::{Position, TermId};
use crate::repo::ensure_tables_ready;
use crate::repo::term_repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};

/// Key-value contract for stored term positions.
pub trait PositionStore {
    /// Returns the stored position, or `None` if none was ever set.
    fn get_position(&self, term_id: TermId) -> RepoResult<Option<Position>>;
    /// Inserts or replaces the position of one term.
    fn set_position(&self, term_id: TermId, position: Position) -> RepoResult<()>;
}

/// SQLite-backed position store over the `term_positions` table.
pub struct SqlitePositionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePositionStore<'conn> {
    /// Creates store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables_ready(conn, &["term_positions"])?;
        Ok(Self { conn })
    }
}

impl PositionStore for SqlitePositionStore<'_> {
    fn get_position(&self, term_id: TermId) -> RepoResult<Option<Position>> {
        let raw: Option<Value> = self
            .conn
            .query_row(
                "SELECT position FROM term_positions WHERE term_id = ?1;",
                [term_id],
                |row| row.get(0),
            )
            .optional()?;

        position_from_value(term_id, raw.unwrap_or(Value::Null))
    }

    fn set_position(&self, term_id: TermId, position: Position) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO term_positions (term_id, position)
             VALUES (?1, ?2)
             ON CONFLICT(term_id) DO UPDATE SET
                position = excluded.position,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![term_id, position],
        )?;
        Ok(())
    }
}

/// Converts a raw `position` column into the read model.
///
/// Every read path goes through here so corrupt rows fail the same way.
pub(crate) fn position_from_value(term_id: TermId, raw: Value) -> RepoResult<Option<Position>> {
    match raw {
        Value::Null => Ok(None),
        Value::Integer(position) => Ok(Some(position)),
        other => Err(RepoError::InvalidData(format!(
            "non-integer position {other:?} for term {term_id}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{PositionStore, SqlitePositionStore};
    use crate::db::open_db_in_memory;
    use crate::repo::term_repo::RepoError;

    #[test]
    fn missing_position_is_none() {
        let conn = open_db_in_memory().unwrap();
        let store = SqlitePositionStore::try_new(&conn).unwrap();
        assert_eq!(store.get_position(42).unwrap(), None);
    }

    #[test]
    fn set_position_upserts() {
        let conn = open_db_in_memory().unwrap();
        let store = SqlitePositionStore::try_new(&conn).unwrap();

        store.set_position(42, 3).unwrap();
        store.set_position(42, 3).unwrap();
        assert_eq!(store.get_position(42).unwrap(), Some(3));

        store.set_position(42, 1).unwrap();
        assert_eq!(store.get_position(42).unwrap(), Some(1));

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM term_positions;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn non_integer_position_is_invalid_data() {
        let conn = open_db_in_memory().unwrap();
        conn.execute(
            "INSERT INTO term_positions (term_id, position) VALUES (7, 'first');",
            [],
        )
        .unwrap();
        let store = SqlitePositionStore::try_new(&conn).unwrap();

        let err = store.get_position(7).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }
}
