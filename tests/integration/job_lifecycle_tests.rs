/*!
 * Integration tests for whole archive translation runs
 */

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use epubwai::app_config::TranslationMode;
use epubwai::app_controller::{ArchiveOutcome, Controller, JobPhase};
use epubwai::archive::{self, ISSUES_LOG};
use epubwai::database::{ChapterState, StatusStore, STORE_FILENAME};
use epubwai::progress::{ProgressEvent, ProgressReporter};
use epubwai::providers::mock::MockProvider;
use crate::common::{self, CHAPTER_COUNT};

/// Transient failures rotate to the other endpoint and the book is still produced
#[tokio::test]
async fn test_run_withTransientFailures_shouldRotateEndpointsAndRepack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let archive = common::create_test_epub(temp_dir.path(), "novel.epub")?;
    let provider = MockProvider::fail_first(2);
    let controller = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(provider.clone()));

    let report = controller.run(&[archive]).await?;

    assert!(report.is_success());
    let output = temp_dir.path().join("novel_translated.epub");
    match &report.archives[0].outcome {
        ArchiveOutcome::Done { output: written } => assert_eq!(written, &output),
        other => panic!("expected a finished archive, got {:?}", other),
    }
    assert!(!temp_dir.path().join("novel_translated").exists());

    // Two failures on the starting endpoint, the third attempt on the other one
    let mut endpoints_by_text: HashMap<String, Vec<String>> = HashMap::new();
    for call in provider.calls() {
        endpoints_by_text.entry(call.text).or_default().push(call.endpoint);
    }
    assert_eq!(endpoints_by_text.len(), CHAPTER_COUNT * 3);
    for (text, endpoints) in &endpoints_by_text {
        assert_eq!(endpoints.len(), 3, "unexpected attempts for '{}'", text);
        assert_eq!(endpoints[0], endpoints[1]);
        assert_ne!(endpoints[1], endpoints[2]);
    }

    Ok(())
}

/// The repacked archive is a valid EPUB with translated chapters only
#[tokio::test]
async fn test_run_shouldWriteTranslatedChaptersWithMimetypeFirst() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let archive = common::create_test_epub(temp_dir.path(), "novel.epub")?;
    let controller = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(MockProvider::working()));

    controller.run(&[archive]).await?;

    let output = temp_dir.path().join("novel_translated.epub");
    let names = common::entry_names(&output)?;
    assert_eq!(names[0], "mimetype");
    assert!(names.contains(&"META-INF/container.xml".to_string()));
    assert!(names.iter().all(|n| !n.contains(STORE_FILENAME) && !n.ends_with(".staged")));
    assert!(names.iter().all(|n| !n.ends_with(ISSUES_LOG)));

    for n in 1..=CHAPTER_COUNT {
        let chapter = common::read_entry(&output, &common::chapter_path(n))?;
        assert!(chapter.contains(&format!("[fr] Text of chapter {}.", n)));
        assert!(chapter.contains(&format!("[fr] Heading {}", n)));
        assert!(chapter.contains(&format!("Untouched {}", n)));
        assert!(!chapter.contains("[fr] Untouched"));
    }

    Ok(())
}

/// Bilingual mode keeps the original text next to the translation
#[tokio::test]
async fn test_run_inBilingualMode_shouldKeepOriginalText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let archive = common::create_test_epub(temp_dir.path(), "novel.epub")?;
    let mut config = common::test_config();
    config.job.mode = TranslationMode::Bilingual;
    let controller = Controller::with_config(config)?.with_provider(Arc::new(MockProvider::working()));

    controller.run(&[archive]).await?;

    let chapter = common::read_entry(
        &temp_dir.path().join("novel_translated.epub"),
        &common::chapter_path(2),
    )?;
    assert!(chapter.contains("Text of chapter 2. [[fr] Text of chapter 2.]"));

    Ok(())
}

/// A fragment that never translates leaves its chapter untouched and in error
#[tokio::test]
async fn test_run_withExhaustedFragment_shouldLeaveChapterUntouchedAndReportIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let archive = common::create_test_epub(temp_dir.path(), "novel.epub")?;
    let provider = MockProvider::working().failing_on("chapter 2");
    let controller = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(provider.clone()));

    let report = controller.run(&[archive]).await?;

    assert!(!report.is_success());
    assert_eq!(report.incomplete_chapters(), 1);
    match &report.archives[0].outcome {
        ArchiveOutcome::Incomplete { chapters } => assert_eq!(chapters, &vec![common::chapter_path(2)]),
        other => panic!("expected an incomplete archive, got {:?}", other),
    }
    assert!(report.to_string().contains("Run the same command again"));

    let work_dir = temp_dir.path().join("novel_translated");
    assert!(!temp_dir.path().join("novel_translated.epub").exists());
    assert_eq!(
        fs::read_to_string(work_dir.join(common::chapter_path(2)))?,
        common::chapter_markup(2)
    );
    assert!(fs::read_to_string(work_dir.join(common::chapter_path(1)))?.contains("[fr] Text of chapter 1."));

    let attempts = provider
        .requested_texts()
        .iter()
        .filter(|t| t.as_str() == "Text of chapter 2.")
        .count();
    assert_eq!(attempts, 5);

    let store = StatusStore::open(work_dir.join(STORE_FILENAME))?;
    let record = store.chapter(&common::chapter_path(2)).await?.expect("chapter row");
    assert_eq!(record.state, ChapterState::Error);
    assert!(record.error_detail.unwrap_or_default().contains("Simulated permanent failure"));
    assert_eq!(store.summary().await?.completed, CHAPTER_COUNT - 1);

    let issues = fs::read_to_string(work_dir.join(ISSUES_LOG))?;
    assert!(issues.contains(&common::chapter_path(2)));

    Ok(())
}

/// The glossary is applied to every translation
#[tokio::test]
async fn test_run_withGlossary_shouldApplyReplacements() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let archive = common::create_test_epub(temp_dir.path(), "novel.epub")?;
    let glossary = common::create_test_file(temp_dir.path(), "names.txt", "chapter:chapitre\n")?;
    let mut config = common::test_config();
    config.translation.common.glossary_path = Some(glossary.to_string_lossy().to_string());
    let controller = Controller::with_config(config)?.with_provider(Arc::new(MockProvider::working()));

    controller.run(&[archive]).await?;

    let chapter = common::read_entry(
        &temp_dir.path().join("novel_translated.epub"),
        &common::chapter_path(1),
    )?;
    assert!(chapter.contains("[fr] Text of chapitre 1."));

    Ok(())
}

/// Chapters already in the destination language are completed without requests
#[tokio::test]
async fn test_run_withChapterAlreadyInTargetLanguage_shouldNotCallProvider() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = temp_dir.path().join("source");
    common::create_test_file(&source, "mimetype", "application/epub+zip")?;
    common::create_test_file(
        &source,
        "OEBPS/chapter1.xhtml",
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>第一章</title></head><body><p>这是一个已经翻译好的章节内容。</p></body></html>",
    )?;
    let archive = temp_dir.path().join("chinese.epub");
    archive::pack_directory(&source, &archive)?;

    let mut config = common::test_config();
    config.target_language = "zh-cn".to_string();
    let provider = MockProvider::working();
    let controller = Controller::with_config(config)?.with_provider(Arc::new(provider.clone()));

    let report = controller.run(&[archive]).await?;

    assert!(report.is_success());
    assert_eq!(provider.request_count(), 0);

    Ok(())
}

/// Self-closing XHTML elements stay empty and the text after them is translated
#[tokio::test]
async fn test_run_withSelfClosingXhtmlElements_shouldTranslateFollowingText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = temp_dir.path().join("source");
    common::create_test_file(&source, "mimetype", "application/epub+zip")?;
    common::create_test_file(
        &source,
        "OEBPS/chapter1.xhtml",
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title/></head><body><div id=\"pg1\"/><p><a id=\"p1\"/>Opening line.</p><p>Closing line.</p></body></html>\n",
    )?;
    let archive = temp_dir.path().join("anchors.epub");
    archive::pack_directory(&source, &archive)?;
    let provider = MockProvider::working();
    let controller = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(provider.clone()));

    let report = controller.run(&[archive]).await?;

    assert!(report.is_success());
    assert_eq!(provider.request_count(), 2);
    let chapter = common::read_entry(
        &temp_dir.path().join("anchors_translated.epub"),
        "OEBPS/chapter1.xhtml",
    )?;
    assert_eq!(
        chapter,
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title></title></head><body><div id=\"pg1\"></div><p><a id=\"p1\"></a>[fr] Opening line.</p><p>[fr] Closing line.</p></body></html>\n"
    );

    Ok(())
}

/// One unusable archive does not stop the others
#[tokio::test]
async fn test_run_withBrokenAndValidArchives_shouldProcessBoth() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let broken = common::create_test_file(temp_dir.path(), "broken.epub", "definitely not a zip")?;
    let missing = temp_dir.path().join("missing.epub");
    let valid = common::create_test_epub(temp_dir.path(), "novel.epub")?;
    let controller = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(MockProvider::working()));

    let report = controller.run(&[broken, missing, valid]).await?;

    assert_eq!(report.archives.len(), 3);
    assert!(matches!(report.archives[0].outcome, ArchiveOutcome::Failed { .. }));
    assert!(matches!(report.archives[1].outcome, ArchiveOutcome::Failed { .. }));
    assert!(report.archives[2].is_done());
    assert!(!report.is_success());

    Ok(())
}

/// An archive without markup chapters fails with a clear message
#[tokio::test]
async fn test_run_withoutChapters_shouldFailArchive() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = temp_dir.path().join("source");
    common::create_test_file(&source, "mimetype", "application/epub+zip")?;
    common::create_test_file(&source, "OEBPS/cover.jpg", "not really an image")?;
    let archive = temp_dir.path().join("empty.epub");
    archive::pack_directory(&source, &archive)?;

    let controller = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(MockProvider::working()));

    let report = controller.run(&[archive]).await?;

    match &report.archives[0].outcome {
        ArchiveOutcome::Failed { error } => assert!(error.contains("No chapters")),
        other => panic!("expected a failed archive, got {:?}", other),
    }

    Ok(())
}

/// Progress events describe the run from scheduling to the final phase
#[tokio::test]
async fn test_run_withProgressReporter_shouldPublishChapterAndPhaseEvents() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let archive = common::create_test_epub(temp_dir.path(), "novel.epub")?;
    let (reporter, mut receiver) = ProgressReporter::channel();
    let controller = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(MockProvider::working()))
        .with_progress(reporter);

    controller.run(&[archive.clone()]).await?;
    drop(controller);

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }

    assert!(events.contains(&ProgressEvent::ArchiveScheduled {
        archive: archive.clone(),
        total: CHAPTER_COUNT,
        completed: 0,
    }));
    let finished = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::ChapterFinished { success: true, .. }))
        .count();
    assert_eq!(finished, CHAPTER_COUNT);
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::PhaseChanged { archive, phase: JobPhase::Done })
    );

    Ok(())
}

/// A job cancelled before it starts leaves the archive alone
#[tokio::test]
async fn test_run_whenCancelledBeforeStart_shouldNotExtract() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let archive = common::create_test_epub(temp_dir.path(), "novel.epub")?;
    let provider = MockProvider::working();
    let controller = Controller::with_config(common::test_config())?
        .with_provider(Arc::new(provider.clone()));
    controller.cancel_token().cancel();

    let report = controller.run(&[archive]).await?;

    assert!(!report.is_success());
    assert!(matches!(report.archives[0].outcome, ArchiveOutcome::Failed { .. }));
    assert!(!temp_dir.path().join("novel_translated").exists());
    assert_eq!(provider.request_count(), 0);

    Ok(())
}
