/*!
 * Tests for the persistent chapter status store
 */

use anyhow::Result;

use epubwai::database::{ChapterState, StatusStore, STORE_FILENAME};
use crate::common;

fn chapters(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

/// Progress written by one store handle is seen by the next one
#[tokio::test]
async fn test_open_afterClose_shouldKeepStatesAndFingerprint() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join(STORE_FILENAME);

    {
        let store = StatusStore::open(&path)?;
        store.seed(&chapters(&["a.xhtml", "b.xhtml", "c.xhtml"]), Some("abc123".to_string())).await?;
        store.mark_in_progress("a.xhtml").await?;
        store.mark_completed("a.xhtml").await?;
        store.mark_in_progress("b.xhtml").await?;
        store.mark_error("b.xhtml", "timed out").await?;
        store.close()?;
    }

    let store = StatusStore::open(&path)?;

    assert!(store.is_seeded().await?);
    assert_eq!(store.fingerprint().await?.as_deref(), Some("abc123"));
    assert_eq!(store.list_incomplete().await?, vec!["b.xhtml", "c.xhtml"]);
    let b = store.chapter("b.xhtml").await?.expect("row for b");
    assert_eq!(b.state, ChapterState::Error);
    assert_eq!(b.error_detail.as_deref(), Some("timed out"));

    Ok(())
}

/// Seeding again never resets progress
#[tokio::test]
async fn test_seed_onSeededStore_shouldKeepCompletedChapters() -> Result<()> {
    let store = StatusStore::new_in_memory()?;
    store.seed(&chapters(&["a.xhtml", "b.xhtml"]), None).await?;
    store.mark_completed("a.xhtml").await?;

    store.seed(&chapters(&["a.xhtml", "b.xhtml"]), None).await?;

    let summary = store.summary().await?;
    assert_eq!(summary.total(), 2);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.pending, 1);

    Ok(())
}

/// Completed is terminal
#[tokio::test]
async fn test_mark_error_onCompletedChapter_shouldNotRegress() -> Result<()> {
    let store = StatusStore::new_in_memory()?;
    store.seed(&chapters(&["a.xhtml"]), None).await?;
    store.mark_completed("a.xhtml").await?;

    store.mark_in_progress("a.xhtml").await?;
    store.mark_error("a.xhtml", "late failure").await?;

    let record = store.chapter("a.xhtml").await?.expect("row for a");
    assert_eq!(record.state, ChapterState::Completed);
    assert!(store.list_incomplete().await?.is_empty());

    Ok(())
}

/// Unknown chapters are reported instead of silently inserted
#[tokio::test]
async fn test_mark_completed_withUnknownChapter_shouldFail() -> Result<()> {
    let store = StatusStore::new_in_memory()?;
    store.seed(&chapters(&["a.xhtml"]), None).await?;

    assert!(store.mark_completed("z.xhtml").await.is_err());
    assert!(store.chapter("z.xhtml").await?.is_none());

    Ok(())
}
