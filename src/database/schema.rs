/*!
 * Status store schema.
 *
 * One row per chapter plus a small key/value table for store-level
 * metadata (seeding marker, archive fingerprint). The schema version lives
 * in SQLite's `user_version` header field.
 */

use anyhow::{Context, Result, bail};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

const CREATE_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS store_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chapters (
        path TEXT PRIMARY KEY,
        state INTEGER NOT NULL DEFAULT 0 CHECK (state BETWEEN 0 AND 3),
        error_detail TEXT,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chapters_state ON chapters(state);
"#;

/// Configure the connection and bring the schema up to date
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // Every committed transition must survive a crash; WAL keeps that cheap
    conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
    conn.execute_batch("PRAGMA synchronous=NORMAL;")?;

    let version = schema_version(conn)?;
    match version {
        v if v == SCHEMA_VERSION => {
            debug!("Status store schema is up to date (v{})", v);
        }
        0 => {
            info!("Creating status store schema v{}", SCHEMA_VERSION);
            conn.execute_batch(CREATE_V1)
                .context("Failed to create status store tables")?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        v => bail!(
            "Status store schema v{} is not supported (expected v{}); delete the working directory to start over",
            v,
            SCHEMA_VERSION
        ),
    }

    Ok(())
}

/// Version recorded in the database header, 0 for a fresh file
pub fn schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Failed to read status store schema version")
}
