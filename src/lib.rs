/*!
 * # EPUBwAI - EPUB translation with AI
 *
 * A Rust library for translating the chapters of EPUB archives through
 * online translation services, resumable at chapter granularity.
 *
 * ## Features
 *
 * - Extract EPUB archives into a working directory next to the source
 * - Track every chapter in a persistent status store (SQLite)
 * - Translate chapter text fragments concurrently, with per-fragment retry,
 *   randomized backoff and endpoint rotation
 * - Replace text in place or keep both languages side by side
 * - Optional glossary applied to every translation
 * - Repackage finished books with a valid EPUB `mimetype` entry
 * - Resume interrupted or partially failed jobs by running them again
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `app_controller`: Job orchestration, one archive at a time
 * - `archive`: Extracting and repacking EPUB containers
 * - `database`: Chapter status store
 * - `translation`: Chapter translation pipeline:
 *   - `translation::markup`: Chapter document parsing and serialization
 *   - `translation::extractor`: Translatable fragment selection
 *   - `translation::retry`: Retry and endpoint rotation policy
 *   - `translation::core`: Fragment translation service
 *   - `translation::batch`: Concurrent fragment dispatch
 *   - `translation::chapter`: Per-chapter state transitions
 * - `providers`: Clients for translation services:
 *   - `providers::google`: Google Translate web endpoint
 *   - `providers::zhipu`: Zhipu AI chat completions
 * - `progress`: Progress events and terminal display
 * - `cancel`: Cooperative cancellation
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod archive;
pub mod cancel;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod progress;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, JobReport};
pub use cancel::CancelToken;
pub use database::StatusStore;
pub use translation::TranslationService;
pub use language_utils::{language_codes_match, get_language_name, validate_language_code};
pub use errors::{AppError, ArchiveError, ProviderError, TranslationError};
