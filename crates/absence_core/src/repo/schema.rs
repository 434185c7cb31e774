//! Connection readiness checks shared by the SQLite stores.

use crate::db::migrations::{current_version, latest_version};
use crate::repo::absence_day_repo::{RepoError, RepoResult};
use rusqlite::Connection;
use std::collections::HashSet;

/// Fails unless `conn` is fully migrated and `table` has every listed column.
pub(crate) fn ensure_table_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let present = column_names(conn, table)?;
    // `pragma_table_info` yields no rows for an unknown table.
    if present.is_empty() {
        return Err(RepoError::MissingRequiredTable(table));
    }
    match columns.iter().copied().find(|column| !present.contains(*column)) {
        Some(column) => Err(RepoError::MissingRequiredColumn { table, column }),
        None => Ok(()),
    }
}

fn column_names(conn: &Connection, table: &str) -> RepoResult<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(names)
}
