//! Database migrations
//!
//! Feed library schema creation.

use rusqlite::Connection;

use super::connection::{DbError, DbResult};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Migration v1: feed library
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- FEED LIBRARY
        -- One composition record per feedstuff.
        -- Percentages are % of DM unless noted.
        -- ============================================
        CREATE TABLE feed_library (
            Fd_Name TEXT PRIMARY KEY,
            Fd_Category TEXT NOT NULL DEFAULT '',

            Fd_DM REAL NOT NULL DEFAULT 100,
            Fd_Conc REAL NOT NULL DEFAULT 0,      -- concentrate share, % of DM

            Fd_CP REAL NOT NULL DEFAULT 0,
            Fd_RUP_base REAL NOT NULL DEFAULT 0,  -- % of CP
            Fd_NPN_CP REAL NOT NULL DEFAULT 0,    -- % of CP
            Fd_CPARU REAL NOT NULL DEFAULT 0,     -- % of CP
            Fd_CPBRU REAL NOT NULL DEFAULT 0,     -- % of CP
            Fd_CPCRU REAL NOT NULL DEFAULT 0,     -- % of CP
            Fd_KdRUP REAL NOT NULL DEFAULT 0,     -- %/h
            Fd_dcRUP REAL NOT NULL DEFAULT 0,     -- % of RUP

            Fd_NDF REAL NOT NULL DEFAULT 0,
            Fd_ADF REAL NOT NULL DEFAULT 0,
            Fd_Lg REAL NOT NULL DEFAULT 0,
            Fd_DNDF48_NDF REAL,                   -- % of NDF, nullable

            Fd_St REAL NOT NULL DEFAULT 0,
            Fd_dcSt REAL NOT NULL DEFAULT 0,      -- % of starch

            Fd_CFat REAL NOT NULL DEFAULT 0,
            Fd_FA REAL NOT NULL DEFAULT 0,
            Fd_dcFA REAL NOT NULL DEFAULT 0,      -- % of FA
            Fd_C160_FA REAL NOT NULL DEFAULT 0,   -- % of FA
            Fd_C183_FA REAL NOT NULL DEFAULT 0,   -- % of FA

            Fd_Ash REAL NOT NULL DEFAULT 0,

            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_feed_library_category ON feed_library(Fd_Category);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

/// Fail unless the schema is current; used by read-only entry points
pub fn ensure_current(conn: &Connection) -> DbResult<()> {
    let found = get_schema_version(conn)?;
    if found < SCHEMA_VERSION {
        return Err(DbError::SchemaOutdated {
            found,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(())
}
