/*!
 * Status store operations.
 *
 * `StatusStore` is the durable per-chapter progress table of one archive job.
 * Every update is a single statement committed before the call returns, so the
 * table survives a crash at any point and drives the resume protocol.
 */

use anyhow::Result;
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::connection::DatabaseConnection;
use super::models::{ChapterRecord, ChapterState, StoreSummary};

/// File name of the status store inside a working directory
pub const STORE_FILENAME: &str = "translation_status.db";

const META_SEEDED: &str = "seeded_at";
const META_FINGERPRINT: &str = "archive_sha256";

/// Handle to the chapter status table of one working directory
#[derive(Clone)]
pub struct StatusStore {
    /// Database connection
    db: DatabaseConnection,
}

impl StatusStore {
    /// Wrap an already opened connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create or open the store at `location`; existing progress is kept
    pub fn open<P: AsRef<Path>>(location: P) -> Result<Self> {
        let db = DatabaseConnection::new(location)?;
        Ok(Self::new(db))
    }

    /// Create a store with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Location of the backing database file
    pub fn path(&self) -> &Path {
        self.db.path()
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Whether a previous run finished seeding this store
    pub async fn is_seeded(&self) -> Result<bool> {
        Ok(self.meta(META_SEEDED).await?.is_some())
    }

    /// Insert one `Pending` row per chapter and mark the store as seeded
    ///
    /// Rows that already exist are left untouched, so calling this again never
    /// duplicates chapters or regresses their state. Returns the number of new rows.
    pub async fn seed(&self, chapter_paths: &[String], fingerprint: Option<String>) -> Result<usize> {
        let chapter_paths = chapter_paths.to_vec();

        self.db
            .transaction_async(move |tx| {
                let now = chrono::Utc::now().to_rfc3339();
                let mut inserted = 0;
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR IGNORE INTO chapters (path, state, error_detail, updated_at) VALUES (?1, ?2, NULL, ?3)",
                    )?;
                    for path in &chapter_paths {
                        inserted += stmt.execute(params![path, ChapterState::Pending.code(), now])?;
                    }
                }

                Self::set_meta_sync(tx, META_SEEDED, &now)?;
                if let Some(fingerprint) = fingerprint {
                    Self::set_meta_sync(tx, META_FINGERPRINT, &fingerprint)?;
                }

                debug!("Seeded {} of {} chapters", inserted, chapter_paths.len());
                Ok(inserted)
            })
            .await
    }

    /// Archive fingerprint recorded at seeding time, if any
    pub async fn fingerprint(&self) -> Result<Option<String>> {
        self.meta(META_FINGERPRINT).await
    }

    async fn meta(&self, key: &'static str) -> Result<Option<String>> {
        self.db
            .execute_async(move |conn| {
                Ok(conn
                    .query_row("SELECT value FROM store_meta WHERE key = ?1", [key], |row| {
                        row.get(0)
                    })
                    .optional()?)
            })
            .await
    }

    fn set_meta_sync(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO store_meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Record that a worker started on the chapter
    ///
    /// Returns `false` when the chapter is already `Completed`; the row is
    /// left alone and the caller must not touch the chapter.
    pub async fn mark_in_progress(&self, path: &str) -> Result<bool> {
        self.transition(path, ChapterState::InProgress, None).await
    }

    /// Record that the chapter was translated and written back
    pub async fn mark_completed(&self, path: &str) -> Result<()> {
        self.transition(path, ChapterState::Completed, None).await?;
        Ok(())
    }

    /// Record that the chapter failed, with a diagnostic
    pub async fn mark_error(&self, path: &str, detail: &str) -> Result<()> {
        self.transition(path, ChapterState::Error, Some(detail.to_string()))
            .await?;
        Ok(())
    }

    async fn transition(
        &self,
        path: &str,
        state: ChapterState,
        detail: Option<String>,
    ) -> Result<bool> {
        let path = path.to_string();

        self.db
            .execute_async(move |conn| {
                // A completed chapter never changes state again
                let updated = conn.execute(
                    "UPDATE chapters SET state = ?1, error_detail = ?2, updated_at = ?3 WHERE path = ?4 AND state != ?5",
                    params![
                        state.code(),
                        detail,
                        chrono::Utc::now().to_rfc3339(),
                        path,
                        ChapterState::Completed.code(),
                    ],
                )?;

                if updated == 0 {
                    let current = Self::chapter_sync(conn, &path)?;
                    match current {
                        None => return Err(anyhow::anyhow!("Unknown chapter: {}", path)),
                        Some(record) if state != ChapterState::Completed => {
                            warn!(
                                "Ignoring transition of {} to {}: chapter is already {}",
                                path, state, record.state
                            );
                        }
                        Some(_) => {}
                    }
                }

                Ok(updated > 0)
            })
            .await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Paths of every chapter that is not `Completed`, ordered by path
    pub async fn list_incomplete(&self) -> Result<Vec<String>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT path FROM chapters WHERE state != ?1 ORDER BY path",
                )?;
                let paths = stmt
                    .query_map([ChapterState::Completed.code()], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(paths)
            })
            .await
    }

    /// Fetch a single chapter record
    pub async fn chapter(&self, path: &str) -> Result<Option<ChapterRecord>> {
        let path = path.to_string();

        self.db
            .execute_async(move |conn| Self::chapter_sync(conn, &path))
            .await
    }

    fn chapter_sync(conn: &Connection, path: &str) -> Result<Option<ChapterRecord>> {
        let record = conn
            .query_row(
                "SELECT path, state, error_detail, updated_at FROM chapters WHERE path = ?1",
                [path],
                Self::row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    /// Every chapter record, ordered by path
    pub async fn list_all(&self) -> Result<Vec<ChapterRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT path, state, error_detail, updated_at FROM chapters ORDER BY path",
                )?;
                let records = stmt
                    .query_map([], Self::row_to_record)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
    }

    /// Chapter counts per state
    pub async fn summary(&self) -> Result<StoreSummary> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM chapters GROUP BY state")?;
                let mut summary = StoreSummary::default();
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                })?;

                for row in rows {
                    let (code, count) = row?;
                    let count = count as usize;
                    match ChapterState::from_code(code) {
                        Some(ChapterState::Pending) => summary.pending = count,
                        Some(ChapterState::InProgress) => summary.in_progress = count,
                        Some(ChapterState::Completed) => summary.completed = count,
                        Some(ChapterState::Error) => summary.error = count,
                        None => warn!("Unknown chapter state code {} in status store", code),
                    }
                }

                Ok(summary)
            })
            .await
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChapterRecord> {
        let code: i64 = row.get(1)?;
        let state = ChapterState::from_code(code).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Integer,
                format!("invalid chapter state {}", code).into(),
            )
        })?;

        Ok(ChapterRecord {
            path: row.get(0)?,
            state,
            error_detail: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }

    /// Flush the write-ahead log so the store is a single file again
    pub fn close(self) -> Result<()> {
        self.db.checkpoint()
    }
}
