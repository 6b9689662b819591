/*!
 * Common test utilities for the epubwai test suite
 */

use anyhow::Result;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use epubwai::app_config::{Config, TranslationProvider};

/// Number of chapters in the fixture book
pub const CHAPTER_COUNT: usize = 3;

/// Routes library logs to the test harness; set RUST_LOG to see them
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    init_test_logging();
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Store path of chapter `n` inside the fixture book
pub fn chapter_path(n: usize) -> String {
    format!("OEBPS/chapter{}.xhtml", n)
}

/// Markup of chapter `n`; every text is unique across the book
pub fn chapter_markup(n: usize) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>Chapter {n}</title></head>\
         <body><h1>Heading {n}</h1><p>Text of chapter {n}.</p><div>Untouched {n}</div></body></html>"
    )
}

/// Builds a small three chapter EPUB at `dir/name`
pub fn create_test_epub(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&path)?);

    zip.start_file("mimetype", FileOptions::default().compression_method(CompressionMethod::Stored))?;
    zip.write_all(b"application/epub+zip")?;

    let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(
        br#"<?xml version="1.0"?><container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container"><rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles></container>"#,
    )?;
    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(b"<package/>")?;

    for n in 1..=CHAPTER_COUNT {
        zip.start_file(chapter_path(n), deflated)?;
        zip.write_all(chapter_markup(n).as_bytes())?;
    }

    zip.finish()?;
    Ok(path)
}

/// Configuration with two mock endpoints and no waiting anywhere
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.target_language = "fr".to_string();
    config.translation.provider = TranslationProvider::Google;
    for provider in config.translation.available_providers.iter_mut() {
        if provider.provider_type == "google" {
            provider.endpoints = vec!["A".to_string(), "B".to_string()];
        }
    }

    let common = &mut config.translation.common;
    common.max_attempts = 5;
    common.rotate_from_attempt = 3;
    common.backoff_min_ms = 0;
    common.backoff_max_ms = 0;

    config.job.chapter_workers = 2;
    config.job.fragment_workers = 2;
    config.job.chapter_cooldown_min_ms = 0;
    config.job.chapter_cooldown_max_ms = 0;
    config
}

/// Names of the entries of an archive, in stored order
pub fn entry_names(archive: &Path) -> Result<Vec<String>> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut names = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        names.push(zip.by_index(index)?.name().to_string());
    }
    Ok(names)
}

/// Content of one archive entry
pub fn read_entry(archive: &Path, name: &str) -> Result<String> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut content = String::new();
    zip.by_name(name)?.read_to_string(&mut content)?;
    Ok(content)
}
