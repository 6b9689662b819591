/*!
 * Archive container handling.
 *
 * Extraction unpacks every entry below the working directory, refusing
 * entries whose names would escape it. Repacking writes the EPUB
 * `mimetype` entry first and uncompressed, then every other file deflated,
 * leaving out the job's own bookkeeping files. The output is assembled in a
 * temporary file next to the target and only moved into place once complete.
 */

use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::database::STORE_FILENAME;
use crate::errors::ArchiveError;
use crate::file_utils::{FileManager, STAGED_SUFFIX};

/// Name of the EPUB media type entry
pub const MIMETYPE_ENTRY: &str = "mimetype";

/// Media type written when the source archive had none
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// Per-archive report of chapters that failed, kept in the working directory
pub const ISSUES_LOG: &str = "translation_issues.log";

/// Files the job creates inside the working directory
pub fn is_bookkeeping_file(relative: &str) -> bool {
    let name = relative.rsplit('/').next().unwrap_or(relative);
    name.starts_with(STORE_FILENAME) || name == ISSUES_LOG || name.ends_with(STAGED_SUFFIX)
}

/// Unpack `archive` into `dest`; returns the number of files written
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, ArchiveError> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;
    fs::create_dir_all(dest)?;

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| ArchiveError::UnsafePath(entry.name().to_string()))?;
        let target = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    info!("Extracted {} files from {}", written, archive.display());
    Ok(written)
}

/// Zip the content of `source_dir` into `output`
///
/// Returns the number of entries written, `mimetype` included.
pub fn pack_directory(source_dir: &Path, output: &Path) -> Result<usize, ArchiveError> {
    let parent = output.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".epubwai-")
        .suffix(".part")
        .tempfile_in(parent)?;

    let mut count = 0;
    {
        let mut zip = ZipWriter::new(temp.as_file_mut());
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let mimetype_path = source_dir.join(MIMETYPE_ENTRY);
        let mimetype = if mimetype_path.is_file() {
            fs::read(&mimetype_path)?
        } else {
            EPUB_MIMETYPE.as_bytes().to_vec()
        };
        zip.start_file(MIMETYPE_ENTRY, stored)?;
        zip.write_all(&mimetype)?;
        count += 1;

        for entry in WalkDir::new(source_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ArchiveError::Io(io::Error::other(e)))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(source_dir)
                .map(FileManager::to_store_path)
                .map_err(|_| ArchiveError::UnsafePath(entry.path().display().to_string()))?;
            if relative == MIMETYPE_ENTRY || is_bookkeeping_file(&relative) {
                debug!("Leaving {} out of the archive", relative);
                continue;
            }

            zip.start_file(relative.as_str(), deflated)?;
            let mut input = File::open(entry.path())?;
            io::copy(&mut input, &mut zip)?;
            count += 1;
        }

        zip.finish()?;
    }

    temp.as_file().sync_all()?;
    temp.persist(output).map_err(|e| ArchiveError::Io(e.error))?;

    info!("Wrote {} entries to {}", count, output.display());
    Ok(count)
}
