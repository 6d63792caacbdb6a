pub mod migrations;
pub mod queries;

use anyhow::Context;
use rusqlite::Connection;

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Returns true when `err` wraps a SQLite constraint failure with the given
/// extended result code (e.g. `rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE`).
pub fn is_constraint(err: &anyhow::Error, extended_code: i32) -> bool {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, _)) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation && e.extended_code == extended_code
        }
        _ => false,
    }
}

pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    is_constraint(err, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
}

pub fn is_foreign_key_violation(err: &anyhow::Error) -> bool {
    is_constraint(err, rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}
