/*!
 * Integration tests for resuming jobs from the working directory
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use epubwai::app_controller::{ArchiveOutcome, Controller};
use epubwai::database::{ChapterState, StatusStore, STORE_FILENAME};
use epubwai::file_utils::FileManager;
use epubwai::providers::mock::MockProvider;
use crate::common::{self, CHAPTER_COUNT};

/// A second run only translates what the first one left behind
#[tokio::test]
async fn test_rerun_afterFailedChapter_shouldOnlyTranslateRemainingChapter() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let archive = common::create_test_epub(temp_dir.path(), "novel.epub")?;

    let first = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(MockProvider::working().failing_on("chapter 3")));
    let report = first.run(&[archive.clone()]).await?;
    assert_eq!(report.incomplete_chapters(), 1);

    let provider = MockProvider::working();
    let second = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(provider.clone()));
    let report = second.run(&[archive]).await?;

    assert!(report.is_success());
    let mut texts = provider.requested_texts();
    texts.sort();
    assert_eq!(texts, vec!["Chapter 3", "Heading 3", "Text of chapter 3."]);

    let output = temp_dir.path().join("novel_translated.epub");
    for n in 1..=CHAPTER_COUNT {
        let chapter = common::read_entry(&output, &common::chapter_path(n))?;
        assert!(chapter.contains(&format!("[fr] Text of chapter {}.", n)));
        assert!(!chapter.contains("[fr] [fr]"));
    }
    assert!(!temp_dir.path().join("novel_translated").exists());

    Ok(())
}

/// Leftovers of a crash are settled from the store before scheduling
#[tokio::test]
async fn test_rerun_afterCrash_shouldRecoverStagedFilesAndStaleRows() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let archive = common::create_test_epub(temp_dir.path(), "novel.epub")?;
    let work_dir = temp_dir.path().join("novel_translated");

    let first = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(MockProvider::working().failing_on("chapter 3")));
    first.run(&[archive.clone()]).await?;

    // Chapter 1 crashed after being recorded, chapter 3 while still in flight
    let chapter1 = work_dir.join(common::chapter_path(1));
    let chapter3 = work_dir.join(common::chapter_path(3));
    FileManager::write_staged(&chapter1, b"<p>recovered</p>")?;
    FileManager::write_staged(&chapter3, b"<p>half written</p>")?;
    let store = StatusStore::open(work_dir.join(STORE_FILENAME))?;
    store.mark_in_progress(&common::chapter_path(3)).await?;
    store.close()?;

    let second = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(MockProvider::working()));
    let report = second.run(&[archive]).await?;

    assert!(report.is_success());
    let output = temp_dir.path().join("novel_translated.epub");
    assert_eq!(common::read_entry(&output, &common::chapter_path(1))?, "<p>recovered</p>");
    let chapter = common::read_entry(&output, &common::chapter_path(3))?;
    assert!(chapter.contains("[fr] Text of chapter 3."));
    assert!(!chapter.contains("half written"));

    Ok(())
}

/// Cancelling mid-run keeps every unfinished chapter untouched and resumable
#[tokio::test]
async fn test_run_whenCancelledMidway_shouldLeaveResumableWorkingDirectory() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let archive = common::create_test_epub(temp_dir.path(), "novel.epub")?;
    let work_dir = temp_dir.path().join("novel_translated");

    let controller = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(MockProvider::slow(2_000)));
    let cancel = controller.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(10), controller.run(&[archive.clone()])).await??;

    match &report.archives[0].outcome {
        ArchiveOutcome::Incomplete { chapters } => assert_eq!(chapters.len(), CHAPTER_COUNT),
        other => panic!("expected an incomplete archive, got {:?}", other),
    }
    for n in 1..=CHAPTER_COUNT {
        assert_eq!(
            fs::read_to_string(work_dir.join(common::chapter_path(n)))?,
            common::chapter_markup(n)
        );
    }
    {
        let store = StatusStore::open(work_dir.join(STORE_FILENAME))?;
        for record in store.list_all().await? {
            assert_ne!(record.state, ChapterState::Completed);
            assert_ne!(record.state, ChapterState::InProgress);
        }
        store.close()?;
    }

    let resumed = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(MockProvider::working()));
    let report = resumed.run(&[archive]).await?;

    assert!(report.is_success());

    Ok(())
}
