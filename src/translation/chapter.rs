/*!
 * Per-chapter translation.
 *
 * A chapter run moves its status row from `InProgress` to exactly one of
 * `Completed` or `Error`. The chapter file is only ever replaced as a whole:
 * the new markup is written to `<file>.staged`, the row is marked completed,
 * then the staged file is renamed over the original. A staged file that
 * outlives a crash is settled by the orchestrator's recovery sweep.
 */

use log::{debug, error, info, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, TranslationMode};
use crate::cancel::CancelToken;
use crate::database::StatusStore;
use crate::errors::{ChapterError, TranslationError};
use crate::file_utils::FileManager;
use crate::progress::{ProgressEvent, ProgressReporter};

use super::batch::FragmentBatch;
use super::core::TranslationService;
use super::detect::{NeverTranslated, ScriptCheck, TranslatedCheck};
use super::extractor::FragmentExtractor;
use super::formatting::format_translation;
use super::markup::ChapterDocument;
use super::retry::random_between;

/// Error detail stored for chapters interrupted by cancellation
pub const CANCELLED_DETAIL: &str = "cancelled";

/// How a successful chapter run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterOutcome {
    /// Fragments were translated and the file rewritten
    Translated { fragments: usize },
    /// The chapter already reads as the destination language; file untouched
    AlreadyTranslated,
    /// No fragment qualified; file untouched
    NothingToTranslate,
    /// The status row was already `Completed`; nothing was read or written
    AlreadyCompleted,
}

/// Translates chapters of one working directory
#[derive(Clone)]
pub struct ChapterTranslator {
    store: StatusStore,
    batch: FragmentBatch,
    extractor: FragmentExtractor,
    mode: TranslationMode,
    target_language: String,
    check: Arc<dyn TranslatedCheck>,
    cooldown: (Duration, Duration),
    progress: ProgressReporter,
    cancel: CancelToken,
}

impl ChapterTranslator {
    /// Create a translator from job settings
    pub fn new(
        store: StatusStore,
        service: TranslationService,
        config: &Config,
        progress: ProgressReporter,
    ) -> Self {
        let job = &config.job;
        let check: Arc<dyn TranslatedCheck> = if job.skip_translated_chapters {
            Arc::new(ScriptCheck::default())
        } else {
            Arc::new(NeverTranslated)
        };
        let cancel = service.cancel_token().clone();

        Self {
            store,
            batch: FragmentBatch::new(service, job.fragment_workers),
            extractor: FragmentExtractor::new(job.tags_to_translate.as_slice()),
            mode: job.mode,
            target_language: config.target_language.clone(),
            check,
            cooldown: (
                Duration::from_millis(job.chapter_cooldown_min_ms),
                Duration::from_millis(job.chapter_cooldown_max_ms.max(job.chapter_cooldown_min_ms)),
            ),
            progress,
            cancel,
        }
    }

    /// Replace the already-translated predicate
    pub fn with_check(mut self, check: Arc<dyn TranslatedCheck>) -> Self {
        self.check = check;
        self
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    /// Run one chapter to a terminal state
    ///
    /// On any failure the row is marked `Error` with the failure as detail
    /// and the chapter file is left as it was.
    pub async fn translate_chapter(&self, work_dir: &Path, chapter: &str) -> Result<ChapterOutcome, ChapterError> {
        if self.cancel.is_cancelled() {
            return Err(ChapterError::Cancelled);
        }

        let started = self
            .store
            .mark_in_progress(chapter)
            .await
            .map_err(ChapterError::Store)?;
        if !started {
            debug!("Chapter {} is already completed", chapter);
            self.progress.send(ProgressEvent::ChapterFinished {
                path: chapter.to_string(),
                success: true,
                detail: None,
            });
            return Ok(ChapterOutcome::AlreadyCompleted);
        }

        let result = self.run(work_dir, chapter).await;

        match &result {
            Ok(outcome) => {
                debug!("Chapter {} finished: {:?}", chapter, outcome);
                self.progress.send(ProgressEvent::ChapterFinished {
                    path: chapter.to_string(),
                    success: true,
                    detail: None,
                });
            }
            Err(e) => {
                let detail = match e {
                    ChapterError::Cancelled => CANCELLED_DETAIL.to_string(),
                    other => other.to_string(),
                };
                if matches!(e, ChapterError::Cancelled) {
                    warn!("Chapter {} interrupted", chapter);
                } else {
                    error!("Chapter {} failed: {}", chapter, detail);
                }
                if let Err(store_error) = self.store.mark_error(chapter, &detail).await {
                    error!("Could not record failure of {}: {:#}", chapter, store_error);
                }
                self.progress.send(ProgressEvent::ChapterFinished {
                    path: chapter.to_string(),
                    success: false,
                    detail: Some(detail),
                });
            }
        }

        result
    }

    async fn run(&self, work_dir: &Path, chapter: &str) -> Result<ChapterOutcome, ChapterError> {
        let file = FileManager::resolve_chapter(work_dir, chapter);
        let bytes = fs::read(&file)?;
        let document = ChapterDocument::from_bytes(bytes, &file)?;

        let fragments = self.extractor.extract(document.root());
        if fragments.is_empty() {
            debug!("No translatable text in {}", chapter);
            self.mark_completed(chapter).await?;
            return Ok(ChapterOutcome::NothingToTranslate);
        }

        if self.check.is_translated(&document.text_content(), &self.target_language) {
            info!("Chapter {} is already in {}, skipping", chapter, self.target_language);
            self.mark_completed(chapter).await?;
            return Ok(ChapterOutcome::AlreadyTranslated);
        }

        let total = fragments.len();
        self.progress.send(ProgressEvent::ChapterStarted {
            path: chapter.to_string(),
            fragments: total,
        });

        let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
        let progress = self.progress.clone();
        let path = chapter.to_string();
        let results = self
            .batch
            .translate_all(&texts, &self.target_language, move |done, total| {
                progress.send(ProgressEvent::FragmentDone { path: path.clone(), done, total });
            })
            .await;

        let mut translations = Vec::with_capacity(total);
        let mut failed = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(translated) => translations.push(translated),
                Err(TranslationError::Cancelled) => return Err(ChapterError::Cancelled),
                Err(e) => {
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(first_error) = first_error {
            return Err(ChapterError::FragmentsFailed { failed, total, first_error });
        }

        for (fragment, translated) in fragments.iter().zip(&translations) {
            fragment.replace_text(&format_translation(self.mode, &fragment.text, translated));
        }
        let output = document.serialize()?;

        // The file must not change if the job was stopped meanwhile
        if self.cancel.is_cancelled() {
            return Err(ChapterError::Cancelled);
        }

        let staged = FileManager::write_staged(&file, &output)?;
        if let Err(e) = self.store.mark_completed(chapter).await {
            if let Err(remove_error) = fs::remove_file(&staged) {
                warn!("Could not remove {:?}: {}", staged, remove_error);
            }
            return Err(ChapterError::Store(e));
        }
        // Completed is durable; a failed rename is finished by the recovery sweep
        if let Err(e) = FileManager::promote_staged(&staged) {
            error!("Could not move {:?} into place: {}", staged, e);
        }

        info!("Translated {} ({} fragments)", chapter, total);
        Ok(ChapterOutcome::Translated { fragments: total })
    }

    async fn mark_completed(&self, chapter: &str) -> Result<(), ChapterError> {
        self.store.mark_completed(chapter).await.map_err(ChapterError::Store)
    }

    /// Random pause between chapters; `false` if cancelled meanwhile
    pub async fn cool_down(&self) -> bool {
        let wait = random_between(&mut rand::rng(), self.cooldown.0, self.cooldown.1);
        if !wait.is_zero() {
            debug!("Cooling down for {:?}", wait);
        }
        self.cancel.sleep(wait).await
    }
}
