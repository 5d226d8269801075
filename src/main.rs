/*!
 * scitrans binary entry point: CLI parsing, logger setup, config loading,
 * and process exit codes (0 clean, 1 completed with markings, 2 failure).
 */

use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;

use clap::{Parser, Subcommand};
use log::{error, info, warn, LevelFilter, Metadata, Record};

use scitrans::app_config::{Config, LogLevel};
use scitrans::app_controller::Controller;
use scitrans::document::RunStatus;
use scitrans::errors::AppError;

/// Scientific document translator with formula preservation
#[derive(Parser)]
#[command(name = "scitrans", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a document and write the translated artifact
    Translate {
        /// Root source file (inclusion directives are resolved against it)
        source: PathBuf,

        /// Path of the translated document
        output: PathBuf,

        /// Configuration file (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured source language tag
        #[arg(long)]
        source_language: Option<String>,

        /// Override the configured target language tag
        #[arg(long)]
        target_language: Option<String>,

        /// Override the configured model name
        #[arg(long)]
        model: Option<String>,

        /// Defer terminology conflicts instead of keeping stored entries
        #[arg(long)]
        interactive: bool,

        /// Where to write the outcome JSON (defaults next to the output)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Log level: error, warn, info, debug, trace
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Write a default configuration file to edit
    InitConfig {
        /// Where to write the configuration
        path: PathBuf,
    },
}

/// Minimal stderr logger
struct AppLogger;

impl log::Log for AppLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: AppLogger = AppLogger;

fn init_logger(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn parse_level(value: &str) -> Option<LogLevel> {
    match value.to_lowercase().as_str() {
        "error" => Some(LogLevel::Error),
        "warn" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" => Some(LogLevel::Trace),
        _ => None,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(status) => status.exit_code(),
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            RunStatus::Failed.exit_code()
        }
    };
    process::exit(code);
}

async fn run(cli: Cli) -> Result<RunStatus, AppError> {
    match cli.command {
        Commands::InitConfig { path } => {
            init_logger(LevelFilter::Info);
            Config::default().save(&path)?;
            info!("Wrote default configuration to {:?}", path);
            Ok(RunStatus::Success)
        }

        Commands::Translate {
            source,
            output,
            config,
            source_language,
            target_language,
            model,
            interactive,
            report,
            log_level,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(path)?,
                None => Config::default(),
            };

            if let Some(tag) = source_language {
                config.source_language = tag;
            }
            if let Some(tag) = target_language {
                config.target_language = tag;
            }
            if let Some(model) = model {
                config.provider.model = model;
            }
            if interactive {
                config.terminology.auto_mode = false;
            }
            let unknown_level = match log_level.as_deref().map(parse_level) {
                Some(Some(level)) => {
                    config.log_level = level;
                    None
                }
                Some(None) => log_level,
                None => None,
            };
            config.validate()?;

            init_logger(config.log_level.to_level_filter());
            if let Some(level) = unknown_level {
                warn!("Unknown log level '{level}', keeping configured level");
            }

            let controller = Controller::new(config)?;

            let cancel = controller.cancellation_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received: aborting in-flight sections, keeping completed work");
                    cancel.store(true, Ordering::SeqCst);
                }
            });

            let outcome = controller.run(&source, &output, report.as_deref()).await?;
            Ok(outcome.status)
        }
    }
}
