use anyhow::{Result, Context};
use chrono::Local;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Extensions treated as chapter markup
pub const CHAPTER_EXTENSIONS: &[&str] = &["html", "xhtml", "htm"];

/// Suffix of a chapter written but not yet promoted
pub const STAGED_SUFFIX: &str = ".staged";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Remove a directory tree if it exists
    pub fn remove_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            fs::remove_dir_all(path)
                .with_context(|| format!("Failed to remove directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: `<parent>/<stem><suffix>` for an archive
    pub fn working_dir_for<P: AsRef<Path>>(archive: P, suffix: &str) -> PathBuf {
        let archive = archive.as_ref();
        let stem = archive.file_stem().unwrap_or_default().to_string_lossy();
        let parent = archive.parent().unwrap_or_else(|| Path::new(""));
        parent.join(format!("{}{}", stem, suffix))
    }

    // @generates: `<parent>/<stem><suffix>.<ext>` for an archive
    pub fn output_path_for<P: AsRef<Path>>(archive: P, suffix: &str) -> PathBuf {
        let archive = archive.as_ref();
        let mut output = Self::working_dir_for(archive, suffix).into_os_string();
        if let Some(ext) = archive.extension() {
            output.push(".");
            output.push(ext);
        }
        PathBuf::from(output)
    }

    /// Whether `path` has one of the chapter extensions (case-insensitive)
    pub fn is_chapter_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                CHAPTER_EXTENSIONS.iter().any(|c| ext.eq_ignore_ascii_case(c))
            })
            .unwrap_or(false)
    }

    /// Chapter files below `dir` as sorted, `/`-separated relative paths
    pub fn find_chapters<P: AsRef<Path>>(dir: P) -> Result<Vec<String>> {
        let dir = dir.as_ref();
        let mut chapters = Vec::new();

        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = entry.context("Failed to read directory entry")?;
            if !entry.file_type().is_file() || !Self::is_chapter_file(entry.path()) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(dir)
                .with_context(|| format!("Chapter outside working directory: {:?}", entry.path()))?;
            chapters.push(Self::to_store_path(relative));
        }

        chapters.sort();
        Ok(chapters)
    }

    /// `/`-separated form of a relative path
    pub fn to_store_path<P: AsRef<Path>>(relative: P) -> String {
        relative
            .as_ref()
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Absolute location of a stored chapter path
    pub fn resolve_chapter<P: AsRef<Path>>(work_dir: P, chapter: &str) -> PathBuf {
        chapter
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(work_dir.as_ref().to_path_buf(), |path, part| path.join(part))
    }

    /// Path of the staged copy of `path`
    pub fn staged_path<P: AsRef<Path>>(path: P) -> PathBuf {
        let mut staged = path.as_ref().as_os_str().to_owned();
        staged.push(STAGED_SUFFIX);
        PathBuf::from(staged)
    }

    /// Chapter a staged file belongs to, `None` for other files
    pub fn unstaged_path<P: AsRef<Path>>(staged: P) -> Option<PathBuf> {
        let staged = staged.as_ref().to_string_lossy();
        staged
            .strip_suffix(STAGED_SUFFIX)
            .filter(|chapter| !chapter.is_empty())
            .map(PathBuf::from)
    }

    /// Staged files left anywhere below `dir`
    pub fn find_staged_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut staged = Vec::new();
        for entry in WalkDir::new(dir.as_ref()) {
            let entry = entry.context("Failed to read directory entry")?;
            if entry.file_type().is_file() && entry.path().to_string_lossy().ends_with(STAGED_SUFFIX) {
                staged.push(entry.path().to_path_buf());
            }
        }
        staged.sort();
        Ok(staged)
    }

    /// Write `content` next to `path` as its staged copy and flush it to disk
    pub fn write_staged<P: AsRef<Path>>(path: P, content: &[u8]) -> io::Result<PathBuf> {
        let staged = Self::staged_path(path);
        let mut file = File::create(&staged)?;
        file.write_all(content)?;
        file.sync_all()?;
        Ok(staged)
    }

    /// Move a staged file over its chapter
    pub fn promote_staged<P: AsRef<Path>>(staged: P) -> io::Result<PathBuf> {
        let staged = staged.as_ref();
        let target = Self::unstaged_path(staged).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("Not a staged file: {:?}", staged))
        })?;
        fs::rename(staged, &target)?;
        Ok(target)
    }

    /// Hex SHA-256 of a file's content
    pub fn sha256_file<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        let mut file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher).with_context(|| format!("Failed to read file: {:?}", path))?;
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }
}
