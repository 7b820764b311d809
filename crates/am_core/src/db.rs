use crate::app_error::{AppError, AppResult};
use crate::schema::ARCHIVE_FILE_NAME;
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// Accepts either the archive file itself or a profile directory holding
/// `main.db`. Fails with a configuration error when nothing is there.
pub fn resolve_store_path(raw: &str, role: &str) -> AppResult<PathBuf> {
    if raw.trim().is_empty() {
        return Err(AppError::config(
            "store path is required",
            serde_json::json!({ "role": role }),
        ));
    }

    let path = PathBuf::from(raw);
    let candidate = if path.is_dir() {
        path.join(ARCHIVE_FILE_NAME)
    } else {
        path
    };

    if !candidate.is_file() {
        return Err(AppError::config(
            "store path does not point at an archive",
            serde_json::json!({ "role": role, "path": candidate }),
        ));
    }
    Ok(candidate)
}

/// Opens an existing archive. Never creates or migrates it: the archive
/// schema belongs to the producing application.
pub fn open_archive(db_path: &Path, mode: OpenMode) -> AppResult<Connection> {
    let flags = match mode {
        OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        OpenMode::ReadWrite => {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX
        }
    };

    let conn = Connection::open_with_flags(db_path, flags).map_err(|e| {
        AppError::store(
            "AM_STORE_OPEN_FAILED",
            "failed to open sqlite archive",
            serde_json::json!({ "error": e.to_string(), "path": db_path }),
        )
    })?;

    for table in [
        crate::schema::contacts::TABLE,
        crate::schema::conversations::TABLE,
        crate::schema::messages::TABLE,
    ] {
        if !table_exists(&conn, table)? {
            return Err(AppError::store(
                "AM_STORE_SCHEMA_INCOMPATIBLE",
                "archive is missing a required table",
                serde_json::json!({ "table": table, "path": db_path }),
            ));
        }
    }

    Ok(conn)
}

/// Creates an empty archive with the tables the merge reads and writes.
pub fn init_archive(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::store(
                "AM_STORE_OPEN_FAILED",
                "failed to create archive parent directory",
                serde_json::json!({ "error": e.to_string() }),
            )
        })?;
    }

    let conn = Connection::open(db_path).map_err(|e| {
        AppError::store(
            "AM_STORE_OPEN_FAILED",
            "failed to create sqlite archive",
            serde_json::json!({ "error": e.to_string(), "path": db_path }),
        )
    })?;

    let tx = conn.unchecked_transaction().map_err(|e| {
        AppError::store(
            "AM_STORE_MIGRATION_FAILED",
            "failed to begin migration transaction",
            serde_json::json!({ "error": e.to_string() }),
        )
    })?;

    tx.execute_batch(include_str!("../migrations/0001_archive.sql"))
        .map_err(|e| {
            AppError::store(
                "AM_STORE_MIGRATION_FAILED",
                "failed to apply migration 0001",
                serde_json::json!({ "error": e.to_string() }),
            )
        })?;

    tx.commit().map_err(|e| {
        AppError::store(
            "AM_STORE_MIGRATION_FAILED",
            "failed to commit migration transaction",
            serde_json::json!({ "error": e.to_string() }),
        )
    })?;

    Ok(conn)
}

pub fn table_exists(conn: &Connection, table: &str) -> AppResult<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .map(|count| count > 0)
    .map_err(|e| {
        AppError::store(
            "AM_STORE_QUERY_FAILED",
            "failed to inspect archive schema",
            serde_json::json!({ "error": e.to_string(), "table": table }),
        )
    })
}
