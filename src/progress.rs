/*!
 * Job progress reporting.
 *
 * Workers publish `ProgressEvent`s on a per-run unbounded channel; a single
 * display task drains them into `indicatif` bars: one bar of chapters per
 * archive and one transient bar of fragments per chapter in flight.
 */

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::app_controller::JobPhase;

/// Something worth showing to the operator
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// An archive entered a new phase
    PhaseChanged { archive: PathBuf, phase: JobPhase },
    /// Chapter counts are known for an archive
    ArchiveScheduled {
        archive: PathBuf,
        total: usize,
        completed: usize,
    },
    /// A chapter was picked up
    ChapterStarted { path: String, fragments: usize },
    /// One more fragment of a chapter resolved
    FragmentDone { path: String, done: usize, total: usize },
    /// A chapter run ended
    ChapterFinished {
        path: String,
        success: bool,
        detail: Option<String>,
    },
}

/// Cloneable sending side; a disabled reporter drops every event
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    /// Create a reporter and the receiver its events go to
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender: Some(sender) }, receiver)
    }

    /// A reporter that discards everything
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Publish an event; a closed display is not an error
    pub fn send(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .or_else(|_| {
            ProgressStyle::default_bar()
                .template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}")
        })
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

/// Terminal rendering of progress events
pub struct ProgressDisplay {
    multi: MultiProgress,
    archive_bar: Option<ProgressBar>,
    chapter_bars: HashMap<String, ProgressBar>,
}

impl ProgressDisplay {
    /// Draw to stderr, or nowhere when `hidden`
    pub fn new(hidden: bool) -> Self {
        let multi = if hidden {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        Self {
            multi,
            archive_bar: None,
            chapter_bars: HashMap::new(),
        }
    }

    /// Apply one event to the bars
    pub fn handle(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::PhaseChanged { archive, phase } => {
                let name = archive
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if let Some(bar) = &self.archive_bar {
                    bar.set_message(format!("{} - {}", name, phase));
                    if matches!(phase, JobPhase::Done | JobPhase::Incomplete) {
                        bar.finish();
                        self.archive_bar = None;
                    }
                }
            }
            ProgressEvent::ArchiveScheduled { archive, total, completed } => {
                let bar = self.multi.add(ProgressBar::new(total as u64));
                bar.set_style(bar_style(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chapters ({percent}%) {msg}",
                ));
                bar.set_position(completed as u64);
                bar.set_message(
                    archive
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                );
                self.archive_bar = Some(bar);
            }
            ProgressEvent::ChapterStarted { path, fragments } => {
                let bar = self.multi.add(ProgressBar::new(fragments as u64));
                bar.set_style(bar_style("  [{bar:30.green/white}] {pos}/{len} fragments {msg}"));
                bar.set_message(path.clone());
                self.chapter_bars.insert(path, bar);
            }
            ProgressEvent::FragmentDone { path, done, .. } => {
                if let Some(bar) = self.chapter_bars.get(&path) {
                    bar.set_position(done as u64);
                }
            }
            ProgressEvent::ChapterFinished { path, success, .. } => {
                if let Some(bar) = self.chapter_bars.remove(&path) {
                    bar.finish_and_clear();
                    self.multi.remove(&bar);
                }
                if success {
                    if let Some(bar) = &self.archive_bar {
                        bar.inc(1);
                    }
                }
            }
        }
    }

    /// Finish every remaining bar
    pub fn finish(&mut self) {
        for (_, bar) in self.chapter_bars.drain() {
            bar.finish_and_clear();
        }
        if let Some(bar) = self.archive_bar.take() {
            bar.finish();
        }
    }

    /// Drain `receiver` until every reporter is dropped
    pub fn spawn(mut self, mut receiver: UnboundedReceiver<ProgressEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                self.handle(event);
            }
            self.finish();
        })
    }
}
