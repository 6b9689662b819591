use anyhow::{Result, Context};
use futures::stream::{self, StreamExt};
use log::{error, warn, info, debug};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::app_config::{Config, TranslationMode};
use crate::archive::{self, ISSUES_LOG};
use crate::cancel::CancelToken;
use crate::database::{StatusStore, StoreSummary, ChapterState, STORE_FILENAME};
use crate::errors::{AppError, ArchiveError};
use crate::file_utils::FileManager;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::providers::Provider;
use crate::translation::{ChapterOutcome, ChapterTranslator, TranslationService};

// @module: Job orchestration over archives and chapters

/// Where an archive stands within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    NotStarted,
    Extracting,
    Translating,
    Repackaging,
    Done,
    Incomplete,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Extracting => "extracting",
            Self::Translating => "translating",
            Self::Repackaging => "repackaging",
            Self::Done => "done",
            Self::Incomplete => "incomplete",
        };
        write!(f, "{}", name)
    }
}

/// One archive to translate, with the settings it runs under
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub archive: PathBuf,
    pub work_dir: PathBuf,
    pub output: PathBuf,
    pub target_language: String,
    pub chapter_workers: usize,
    pub fragment_workers: usize,
    pub tags: Vec<String>,
    pub mode: TranslationMode,
    pub phase: JobPhase,
}

impl TranslationJob {
    /// Describe the job for `archive` under `config`
    pub fn new<P: AsRef<Path>>(archive: P, config: &Config) -> Self {
        let archive = archive.as_ref().to_path_buf();
        let suffix = &config.job.output_suffix;

        Self {
            work_dir: FileManager::working_dir_for(&archive, suffix),
            output: FileManager::output_path_for(&archive, suffix),
            archive,
            target_language: config.target_language.clone(),
            chapter_workers: config.job.chapter_workers.max(1),
            fragment_workers: config.job.fragment_workers.max(1),
            tags: config.job.tags_to_translate.clone(),
            mode: config.job.mode,
            phase: JobPhase::NotStarted,
        }
    }

    /// Location of the status store
    pub fn store_path(&self) -> PathBuf {
        self.work_dir.join(STORE_FILENAME)
    }
}

/// Final state of one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Every chapter completed and the output archive was written
    Done { output: PathBuf },
    /// Some chapters are still pending or failed; the working directory is kept
    Incomplete { chapters: Vec<String> },
    /// The archive could not be processed at all
    Failed { error: String },
}

/// Result of one archive within a run
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub archive: PathBuf,
    pub work_dir: PathBuf,
    pub outcome: ArchiveOutcome,
    pub summary: Option<StoreSummary>,
}

impl ArchiveReport {
    pub fn is_done(&self) -> bool {
        matches!(self.outcome, ArchiveOutcome::Done { .. })
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub archives: Vec<ArchiveReport>,
}

impl JobReport {
    /// True only if every archive is `Done`
    pub fn is_success(&self) -> bool {
        self.archives.iter().all(ArchiveReport::is_done)
    }

    /// Number of chapters left over across all archives
    pub fn incomplete_chapters(&self) -> usize {
        self.archives
            .iter()
            .map(|report| match &report.outcome {
                ArchiveOutcome::Incomplete { chapters } => chapters.len(),
                _ => 0,
            })
            .sum()
    }
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.archives {
            match &report.outcome {
                ArchiveOutcome::Done { output } => {
                    writeln!(f, "{}: done -> {}", report.archive.display(), output.display())?;
                }
                ArchiveOutcome::Incomplete { chapters } => {
                    writeln!(
                        f,
                        "{}: {} chapter(s) not translated (progress kept in {}):",
                        report.archive.display(),
                        chapters.len(),
                        report.work_dir.display()
                    )?;
                    for chapter in chapters {
                        writeln!(f, "  - {}", chapter)?;
                    }
                }
                ArchiveOutcome::Failed { error } => {
                    writeln!(f, "{}: failed: {}", report.archive.display(), error)?;
                }
            }
        }
        if !self.is_success() {
            write!(f, "Run the same command again to resume the remaining work.")?;
        }
        Ok(())
    }
}

/// Main application controller for archive translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    provider: Option<Arc<dyn Provider>>,
    cancel: CancelToken,
    progress: ProgressReporter,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            provider: None,
            cancel: CancelToken::new(),
            progress: ProgressReporter::disabled(),
        })
    }

    /// Use `provider` instead of the one named in the configuration
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Publish progress events through `progress`
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Token that stops the run when cancelled
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn build_service(&self) -> Result<TranslationService> {
        match &self.provider {
            Some(provider) => {
                TranslationService::from_config_with_provider(&self.config, provider.clone(), self.cancel.clone())
            }
            None => TranslationService::from_config(&self.config, self.cancel.clone()),
        }
    }

    /// Translate every archive in turn; one archive failing never stops the others
    pub async fn run(&self, archives: &[PathBuf]) -> Result<JobReport> {
        let service = self.build_service().context("Failed to set up the translation service")?;
        info!(
            "Translating {} archive(s) into {} via {} ({} endpoint(s))",
            archives.len(),
            self.config.target_language,
            service.provider_name(),
            service.endpoint_count()
        );

        let mut report = JobReport::default();
        for archive in archives {
            let mut job = TranslationJob::new(archive, &self.config);
            if self.cancel.is_cancelled() {
                warn!("Cancelled, not starting {}", archive.display());
                report.archives.push(ArchiveReport {
                    archive: job.archive,
                    work_dir: job.work_dir,
                    outcome: ArchiveOutcome::Failed { error: "cancelled before start".to_string() },
                    summary: None,
                });
                continue;
            }
            report.archives.push(self.run_archive(&mut job, &service).await);
        }

        let (hits, misses, _) = service.cache().stats();
        debug!("Translation cache: {} hits, {} misses", hits, misses);
        Ok(report)
    }

    /// Drive one archive through all phases
    pub async fn run_archive(&self, job: &mut TranslationJob, service: &TranslationService) -> ArchiveReport {
        let started = Instant::now();
        let result = self.process_archive(job, service).await;

        let (outcome, summary) = match result {
            Ok(done) => done,
            Err(e) => {
                error!("{}: {}", job.archive.display(), e);
                (ArchiveOutcome::Failed { error: e.to_string() }, None)
            }
        };

        info!(
            "{} finished as {} in {:.1}s",
            job.archive.display(),
            job.phase,
            started.elapsed().as_secs_f64()
        );

        ArchiveReport {
            archive: job.archive.clone(),
            work_dir: job.work_dir.clone(),
            outcome,
            summary,
        }
    }

    fn set_phase(&self, job: &mut TranslationJob, phase: JobPhase) {
        debug!("{}: {} -> {}", job.archive.display(), job.phase, phase);
        job.phase = phase;
        self.progress.send(ProgressEvent::PhaseChanged {
            archive: job.archive.clone(),
            phase,
        });
    }

    async fn process_archive(
        &self,
        job: &mut TranslationJob,
        service: &TranslationService,
    ) -> Result<(ArchiveOutcome, Option<StoreSummary>), AppError> {
        if !FileManager::file_exists(&job.archive) {
            return Err(AppError::File(format!("Archive does not exist: {}", job.archive.display())));
        }

        self.set_phase(job, JobPhase::Extracting);
        let store = Self::prepare_working_dir(job).await?;
        Self::recover_staged(&job.work_dir, &store).await?;

        self.set_phase(job, JobPhase::Translating);
        let pending = store.list_incomplete().await?;
        let summary = store.summary().await?;
        info!(
            "{}: {} of {} chapter(s) left to translate",
            job.archive.display(),
            pending.len(),
            summary.total()
        );
        self.progress.send(ProgressEvent::ArchiveScheduled {
            archive: job.archive.clone(),
            total: summary.total(),
            completed: summary.completed,
        });

        {
            let translator = ChapterTranslator::new(store.clone(), service.clone(), &self.config, self.progress.clone());
            self.translate_chapters(job, &translator, pending).await;
        }

        Self::recover_staged(&job.work_dir, &store).await?;
        let remaining = store.list_incomplete().await?;
        let summary = store.summary().await?;

        if !remaining.is_empty() {
            self.set_phase(job, JobPhase::Incomplete);
            Self::record_issues(job, &store, &remaining).await;
            warn!(
                "{}: {} chapter(s) incomplete ({})",
                job.archive.display(),
                remaining.len(),
                summary
            );
            return Ok((ArchiveOutcome::Incomplete { chapters: remaining }, Some(summary)));
        }

        self.set_phase(job, JobPhase::Repackaging);
        let work_dir = job.work_dir.clone();
        let output = job.output.clone();
        tokio::task::spawn_blocking(move || archive::pack_directory(&work_dir, &output))
            .await
            .map_err(|e| AppError::Unknown(format!("Repack task failed: {}", e)))??;

        store.close()?;
        FileManager::remove_dir(&job.work_dir)?;

        self.set_phase(job, JobPhase::Done);
        info!("{}: written {}", job.archive.display(), job.output.display());
        Ok((ArchiveOutcome::Done { output: job.output.clone() }, Some(summary)))
    }

    /// Reuse a seeded working directory, or extract and seed a fresh one
    async fn prepare_working_dir(job: &TranslationJob) -> Result<StatusStore, AppError> {
        let store_path = job.store_path();
        let fingerprint = FileManager::sha256_file(&job.archive)?;

        if FileManager::dir_exists(&job.work_dir) && FileManager::file_exists(&store_path) {
            let store = StatusStore::open(&store_path)?;
            if store.is_seeded().await? {
                match store.fingerprint().await? {
                    Some(recorded) if recorded != fingerprint => warn!(
                        "{} changed since {} was created; resuming with the existing progress",
                        job.archive.display(),
                        job.work_dir.display()
                    ),
                    _ => {}
                }
                info!("Resuming from {}", job.work_dir.display());
                return Ok(store);
            }
            debug!("Store in {} was never seeded, starting over", job.work_dir.display());
        }

        FileManager::remove_dir(&job.work_dir)?;
        FileManager::ensure_dir(&job.work_dir)?;

        let archive_path = job.archive.clone();
        let work_dir = job.work_dir.clone();
        tokio::task::spawn_blocking(move || archive::extract_archive(&archive_path, &work_dir))
            .await
            .map_err(|e| AppError::Unknown(format!("Extraction task failed: {}", e)))??;

        let chapters = FileManager::find_chapters(&job.work_dir)?;
        if chapters.is_empty() {
            return Err(ArchiveError::NoChapters(job.archive.display().to_string()).into());
        }

        let store = StatusStore::open(&store_path)?;
        let seeded = store.seed(&chapters, Some(fingerprint)).await?;
        info!("{}: found {} chapter(s)", job.archive.display(), seeded);
        Ok(store)
    }

    /// Settle staged files left by an interrupted run
    ///
    /// A staged file of a completed chapter is moved into place; any other
    /// staged file is discarded.
    pub async fn recover_staged(work_dir: &Path, store: &StatusStore) -> Result<usize, AppError> {
        let mut settled = 0;

        for staged in FileManager::find_staged_files(work_dir)? {
            let Some(chapter_file) = FileManager::unstaged_path(&staged) else {
                continue;
            };
            let chapter = chapter_file
                .strip_prefix(work_dir)
                .map(FileManager::to_store_path)
                .unwrap_or_default();

            let completed = matches!(
                store.chapter(&chapter).await?,
                Some(record) if record.state == ChapterState::Completed
            );

            if completed {
                FileManager::promote_staged(&staged)?;
                info!("Recovered translated chapter {}", chapter);
            } else {
                std::fs::remove_file(&staged)?;
                debug!("Discarded unfinished output of {}", chapter);
            }
            settled += 1;
        }

        Ok(settled)
    }

    /// Run the chapter pool over `pending`
    async fn translate_chapters(&self, job: &TranslationJob, translator: &ChapterTranslator, pending: Vec<String>) {
        let semaphore = Arc::new(Semaphore::new(job.chapter_workers));
        let work_dir = job.work_dir.as_path();

        stream::iter(pending)
            .map(|chapter| {
                let semaphore = semaphore.clone();
                async move {
                    let Ok(_permit) = semaphore.acquire().await else {
                        return;
                    };
                    if self.cancel.is_cancelled() {
                        return;
                    }

                    match translator.translate_chapter(work_dir, &chapter).await {
                        Ok(ChapterOutcome::Translated { .. }) => {
                            translator.cool_down().await;
                        }
                        Ok(_) => {}
                        // Already logged and recorded by the translator
                        Err(_) => {}
                    }
                }
            })
            .buffer_unordered(job.chapter_workers)
            .collect::<Vec<_>>()
            .await;
    }

    /// Append every unfinished chapter and its detail to the issues log
    async fn record_issues(job: &TranslationJob, store: &StatusStore, remaining: &[String]) {
        let log_path = job.work_dir.join(ISSUES_LOG);
        for chapter in remaining {
            let line = match store.chapter(chapter).await {
                Ok(Some(record)) => format!(
                    "{} [{}] {}",
                    chapter,
                    record.state,
                    record.error_detail.unwrap_or_default()
                ),
                _ => chapter.clone(),
            };
            if let Err(e) = FileManager::append_to_log_file(&log_path, &line) {
                warn!("Failed to write issues log: {}", e);
                return;
            }
        }
    }
}
