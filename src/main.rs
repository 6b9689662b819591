// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use epubwai::app_config::{self, Config, ProviderConfig, TranslationMode, TranslationProvider};
use epubwai::app_controller::Controller;
use epubwai::progress::{ProgressDisplay, ProgressReporter};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Google,
    Zhipu,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Google => TranslationProvider::Google,
            CliTranslationProvider::Zhipu => TranslationProvider::Zhipu,
        }
    }
}

/// CLI Wrapper for TranslationMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationMode {
    Replace,
    Bilingual,
}

impl From<CliTranslationMode> for TranslationMode {
    fn from(cli_mode: CliTranslationMode) -> Self {
        match cli_mode {
            CliTranslationMode::Replace => TranslationMode::Replace,
            CliTranslationMode::Bilingual => TranslationMode::Bilingual,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate one or more EPUB archives (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for epubwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct TranslateArgs {
    /// EPUB archives to translate
    #[arg(value_name = "ARCHIVE")]
    archives: Vec<PathBuf>,

    /// Destination language code (e.g. 'zh-cn', 'fr', 'ja')
    #[arg(short = 'l', long = "lang")]
    target_language: Option<String>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Replace the text, or keep it with the translation in brackets
    #[arg(long, value_enum)]
    mode: Option<CliTranslationMode>,

    /// Chapters translated at the same time
    #[arg(long)]
    chapter_workers: Option<usize>,

    /// Fragments of one chapter translated at the same time
    #[arg(long)]
    fragment_workers: Option<usize>,

    /// Glossary file with one 'source:target' pair per line
    #[arg(short = 'd', long = "dict", value_name = "GLOSSARY")]
    glossary: Option<PathBuf>,

    /// API key for the active provider
    #[arg(long, env = "EPUBWAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// EPUBwAI - EPUB translation with resumable, per-chapter progress
#[derive(Parser, Debug)]
#[command(name = "epubwai")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(about = "Resumable EPUB translation tool")]
#[command(long_about = "EPUBwAI translates the chapters of EPUB archives through an online translation
service. Progress is stored per chapter next to each archive, so an interrupted or
partially failed run can simply be started again.

EXAMPLES:
    epubwai book.epub                           # Translate using default config
    epubwai translate -l fr book.epub           # Translate into French
    epubwai translate --mode bilingual a.epub b.epub
    epubwai translate -d names.txt book.epub    # Apply a glossary to every translation
    epubwai completions bash > epubwai.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    google - Google Translate web endpoint, rotated across domain suffixes
    zhipu  - Zhipu AI chat completions (requires API key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    args: TranslateArgs,
}

/// Plain copy of every log line, once a log file is configured
static LOG_FILE: OnceCell<Mutex<File>> = OnceCell::new();

// @struct: Custom logger implementation
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger; verbosity is controlled by the max level
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @attaches: Log file mirror
    fn attach_file(path: &str) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path))?;
        LOG_FILE
            .set(Mutex::new(file))
            .map_err(|_| anyhow!("Log file already attached"))
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now();
        let level = record.level();

        let _ = writeln!(
            std::io::stderr(),
            "{}{} {} {}\x1B[0m",
            Self::get_color_for_level(level),
            now.format("%H:%M:%S.%3f"),
            Self::get_emoji_for_level(level),
            record.args()
        );

        if let Some(file) = LOG_FILE.get() {
            let _ = writeln!(
                file.lock(),
                "{} {:<5} [{}] {}",
                now.format("%Y-%m-%d %H:%M:%S%.3f"),
                level,
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(file) = LOG_FILE.get() {
            let _ = file.lock().flush();
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Info until the configuration says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "epubwai", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.args).await,
    }
}

/// Load the configuration file, writing a default one when it is missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        return Config::from_file(config_path);
    }

    warn!("Config file not found at '{}', creating default config.", config_path);
    let config = Config::default();
    config
        .save_to_file(config_path)
        .context(format!("Failed to write default config to file: {}", config_path))?;
    Ok(config)
}

/// Configuration entry of the active provider, created when absent
fn active_provider_config(config: &mut Config) -> &mut ProviderConfig {
    let provider = config.translation.provider.clone();
    let provider_str = provider.to_lowercase_string();
    let providers = &mut config.translation.available_providers;

    let index = match providers.iter().position(|p| p.provider_type == provider_str) {
        Some(index) => index,
        None => {
            providers.push(ProviderConfig::new(provider));
            providers.len() - 1
        }
    };
    &mut providers[index]
}

/// Override configuration values with command line options
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(mode) = &options.mode {
        config.job.mode = mode.clone().into();
    }
    if let Some(workers) = options.chapter_workers {
        config.job.chapter_workers = workers;
    }
    if let Some(workers) = options.fragment_workers {
        config.job.fragment_workers = workers;
    }
    if let Some(glossary) = &options.glossary {
        config.translation.common.glossary_path = Some(glossary.to_string_lossy().to_string());
    }
    if let Some(api_key) = &options.api_key {
        active_provider_config(config).api_key = api_key.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(options: TranslateArgs) -> Result<ExitCode> {
    if options.archives.is_empty() {
        return Err(anyhow!("At least one ARCHIVE is required"));
    }

    let mut config = load_or_create_config(&options.config_path)?;
    apply_overrides(&mut config, &options);
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;

    if let Some(log_file) = config.log_file.as_deref().filter(|f| !f.trim().is_empty()) {
        CustomLogger::attach_file(log_file)?;
    }

    let (reporter, receiver) = ProgressReporter::channel();
    let display = ProgressDisplay::new(!std::io::stderr().is_terminal()).spawn(receiver);

    let controller = Controller::with_config(config)?.with_progress(reporter);

    let cancel = controller.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight work. Completed chapters are kept.");
            cancel.cancel();
        }
    });

    let result = controller.run(&options.archives).await;
    drop(controller);
    let _ = display.await;

    let report = result?;
    if report.is_success() {
        info!("{}", report.to_string().trim_end());
        Ok(ExitCode::SUCCESS)
    } else {
        error!(
            "{} chapter(s) left untranslated",
            report.incomplete_chapters()
        );
        eprintln!("{}", report);
        Ok(ExitCode::FAILURE)
    }
}
