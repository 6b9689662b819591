/*!
 * Error types for the epubwai application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with translation provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider answered but the translation was empty
    #[error("Provider returned an empty translation")]
    EmptyResponse,
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur while translating a single fragment
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Every attempt across the endpoint rotation failed
    #[error("Translation failed after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// The error of the final attempt
        last_error: ProviderError,
    },

    /// The job was cancelled while the fragment was pending
    #[error("Translation cancelled")]
    Cancelled,
}

/// Errors from parsing or serializing chapter markup
#[derive(Error, Debug)]
pub enum MarkupError {
    /// The chapter could not be decoded or parsed
    #[error("Failed to parse markup: {0}")]
    Parse(String),

    /// The document tree could not be written back
    #[error("Failed to serialize markup: {0}")]
    Serialize(#[from] std::io::Error),
}

/// Errors that can occur while extracting or repacking an archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Filesystem error while reading or writing archive content
    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip container itself is malformed
    #[error("Invalid archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An entry would escape the working directory
    #[error("Archive entry has an unsafe path: {0}")]
    UnsafePath(String),

    /// The archive contains no markup chapters
    #[error("No chapters found in {0}")]
    NoChapters(String),
}

/// Errors that fail a single chapter
#[derive(Error, Debug)]
pub enum ChapterError {
    /// The chapter file could not be read or written
    #[error("Chapter I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The chapter markup could not be processed
    #[error(transparent)]
    Markup(#[from] MarkupError),

    /// The status store rejected an update
    #[error("Status store error: {0:#}")]
    Store(anyhow::Error),

    /// One or more fragments never resolved to a translation
    #[error("{failed} of {total} fragments could not be translated: {first_error}")]
    FragmentsFailed {
        /// Number of exhausted fragments
        failed: usize,
        /// Number of qualifying fragments in the chapter
        total: usize,
        /// The first failure, for diagnostics
        first_error: TranslationError,
    },

    /// The job was cancelled before the chapter finished
    #[error("Chapter cancelled before completion")]
    Cancelled,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from archive handling
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Error from chapter translation
    #[error("Chapter error: {0}")]
    Chapter(#[from] ChapterError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(format!("{:#}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
