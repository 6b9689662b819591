/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use epubwai::file_utils::FileManager;
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "exists.tmp", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path().join("missing.tmp")));

    Ok(())
}

/// The working directory and the output sit next to the archive
#[test]
fn test_working_dir_and_output_path_shouldUseArchiveStem() {
    let archive = Path::new("/library/books/dune.epub");

    assert_eq!(
        FileManager::working_dir_for(archive, "_translated"),
        PathBuf::from("/library/books/dune_translated")
    );
    assert_eq!(
        FileManager::output_path_for(archive, "_translated"),
        PathBuf::from("/library/books/dune_translated.epub")
    );
}

/// Only markup files are chapters, whatever the case of the extension
#[test]
fn test_is_chapter_file_shouldMatchMarkupExtensions() {
    assert!(FileManager::is_chapter_file("OEBPS/c1.xhtml"));
    assert!(FileManager::is_chapter_file("text/part0001.HTML"));
    assert!(FileManager::is_chapter_file("old/intro.htm"));
    assert!(!FileManager::is_chapter_file("OEBPS/content.opf"));
    assert!(!FileManager::is_chapter_file("OEBPS/c1.xhtml.staged"));
}

/// Chapters are listed relative to the working directory, in path order
#[test]
fn test_find_chapters_withNestedTree_shouldReturnSortedStorePaths() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "OEBPS/text/b.xhtml", "<p>b</p>")?;
    common::create_test_file(temp_dir.path(), "OEBPS/text/a.xhtml", "<p>a</p>")?;
    common::create_test_file(temp_dir.path(), "OEBPS/nav.html", "<p>nav</p>")?;
    common::create_test_file(temp_dir.path(), "OEBPS/style.css", "p {}")?;
    common::create_test_file(temp_dir.path(), "OEBPS/text/a.xhtml.staged", "<p>tmp</p>")?;

    let chapters = FileManager::find_chapters(temp_dir.path())?;

    assert_eq!(chapters, vec!["OEBPS/nav.html", "OEBPS/text/a.xhtml", "OEBPS/text/b.xhtml"]);

    Ok(())
}

/// A staged write only replaces the chapter once promoted
#[test]
fn test_write_staged_thenPromote_shouldReplaceChapterContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let chapter = common::create_test_file(temp_dir.path(), "c1.xhtml", "original")?;

    let staged = FileManager::write_staged(&chapter, b"translated")?;
    assert_eq!(fs::read_to_string(&chapter)?, "original");
    assert_eq!(FileManager::find_staged_files(temp_dir.path())?, vec![staged.clone()]);

    let promoted = FileManager::promote_staged(&staged)?;

    assert_eq!(promoted, chapter);
    assert_eq!(fs::read_to_string(&chapter)?, "translated");
    assert!(!staged.exists());

    Ok(())
}

/// Identical archives share a fingerprint, changed ones do not
#[test]
fn test_sha256_file_shouldChangeWithContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let a = common::create_test_file(temp_dir.path(), "a.epub", "same bytes")?;
    let b = common::create_test_file(temp_dir.path(), "b.epub", "same bytes")?;
    let c = common::create_test_file(temp_dir.path(), "c.epub", "other bytes")?;

    let hash = FileManager::sha256_file(&a)?;

    assert_eq!(hash.len(), 64);
    assert_eq!(hash, FileManager::sha256_file(&b)?);
    assert_ne!(hash, FileManager::sha256_file(&c)?);

    Ok(())
}
