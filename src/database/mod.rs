/*!
 * Database module for durable chapter progress.
 *
 * This module provides the SQLite-backed status store that records, per
 * chapter of an extracted archive, whether it is pending, in progress,
 * completed or failed. It is the only state that survives a crash.
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{ChapterRecord, ChapterState, StoreSummary};
pub use repository::{StatusStore, STORE_FILENAME};
