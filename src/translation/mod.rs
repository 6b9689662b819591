/*!
 * Chapter translation pipeline.
 *
 * This module contains everything between a chapter file on disk and its
 * translated replacement. It is split into several submodules:
 *
 * - `markup`: Parsing and serializing chapter documents
 * - `extractor`: Selecting translatable text nodes
 * - `retry`: Per-fragment retry and endpoint rotation policy
 * - `core`: Fragment translation service (cache, policy, glossary)
 * - `batch`: Concurrent dispatch of a chapter's fragments
 * - `chapter`: One chapter from `InProgress` to a terminal state
 * - `cache`, `glossary`, `formatting`, `detect`: Helpers used along the way
 */

// Re-export main types for easier usage
pub use self::batch::FragmentBatch;
pub use self::cache::TranslationCache;
pub use self::chapter::{ChapterOutcome, ChapterTranslator};
pub use self::core::TranslationService;
pub use self::detect::{NeverTranslated, ScriptCheck, TranslatedCheck};
pub use self::extractor::{Fragment, FragmentExtractor};
pub use self::glossary::Glossary;
pub use self::markup::{ChapterDocument, MarkupFlavor};
pub use self::retry::{RetryDecision, RetrySettings, RotationPolicy};

// Submodules
pub mod batch;
pub mod cache;
pub mod chapter;
pub mod core;
pub mod detect;
pub mod extractor;
pub mod formatting;
pub mod glossary;
pub mod markup;
pub mod retry;
