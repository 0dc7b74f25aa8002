//! Repository layer for terms and their stored positions.
//!
//! # Responsibility
//! - Define storage contracts used by the ordering services.
//! - Keep SQL details out of service orchestration.
//!
//! # Invariants
//! - Repositories refuse connections that are not fully migrated.
//! - Absence of a stored value is `Ok(None)`, never an error.

pub mod position_repo;
pub mod term_repo;

use crate::db::migrations::{current_user_version, latest_version};
use rusqlite::Connection;
use term_repo::{RepoError, RepoResult};

/// Verifies schema version and table presence before a repository is built.
pub(crate) fn ensure_tables_ready(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
