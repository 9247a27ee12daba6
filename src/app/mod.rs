//! Command implementations.
//!
//! Each command opens a reader from a [`ReaderConfig`], performs its
//! action, prints the result and returns a process exit code. Only
//! transport and I/O failures come back as errors.

mod format;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal as tokio_signal};

use crate::cli::{OutputMode, SourceArgs};
use crate::reader::{ReadOutcome, SpreadsheetReader};
use crate::resolver::{self, Backend, ClipboardProvider, MemoryClipboard, ResolverError, Selection};
use crate::sheet::{self, SheetError};

/// Exit code when the format is not on the clipboard.
pub const EXIT_ABSENT: i32 = 2;
/// Exit code when the payload is not well-formed XML.
pub const EXIT_PARSE_FAILED: i32 = 3;

/// Command errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("background read failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Reader settings collected from the command line.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub format_name: String,
    pub backend: Backend,
    pub selection: Selection,
    pub timeout: Duration,
    /// Payload file standing in for the clipboard.
    pub input: Option<PathBuf>,
}

impl From<&SourceArgs> for ReaderConfig {
    fn from(args: &SourceArgs) -> Self {
        Self {
            format_name: args.format_name.clone(),
            backend: args.backend,
            selection: args.selection,
            timeout: Duration::from_millis(args.timeout_ms),
            input: args.input.clone(),
        }
    }
}

impl ReaderConfig {
    /// Connect to the configured clipboard (or load the input file).
    pub fn open(&self) -> Result<SpreadsheetReader, AppError> {
        let clipboard: Box<dyn ClipboardProvider> = match &self.input {
            Some(path) => Box::new(MemoryClipboard::from_file(&self.format_name, path)?),
            None => resolver::connect(self.backend, self.selection, self.timeout)?,
        };
        Ok(SpreadsheetReader::new(clipboard, self.format_name.clone()))
    }
}

/// `read`: parse the clipboard payload and print it.
pub fn read(config: &ReaderConfig, output: OutputMode) -> Result<i32, AppError> {
    let reader = config.open()?;
    report(reader.read(), reader.format_name(), output)
}

/// `dump`: write the raw payload to stdout.
pub fn dump(config: &ReaderConfig) -> Result<i32, AppError> {
    let reader = config.open()?;
    match reader.read_raw()? {
        Some(raw) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&raw)?;
            stdout.flush()?;
            Ok(0)
        }
        None => {
            eprintln!("No {:?} content on the clipboard", reader.format_name());
            Ok(EXIT_ABSENT)
        }
    }
}

/// `formats`: list what the clipboard owner offers.
pub fn formats(config: &ReaderConfig) -> Result<i32, AppError> {
    let reader = config.open()?;
    format::print_formats(&reader.formats()?);
    Ok(0)
}

/// `watch`: poll the clipboard and print each new payload.
///
/// Runs until SIGINT or SIGTERM. Transport errors are logged and the
/// next tick tries again, since the selection owner may come and go.
pub async fn watch(
    config: &ReaderConfig,
    interval: Duration,
    output: OutputMode,
) -> Result<i32, AppError> {
    let reader = Arc::new(config.open()?);

    let mut sig_term = tokio_signal(SignalKind::terminate())?;
    let mut sig_int = tokio_signal(SignalKind::interrupt())?;
    let mut ticks = tokio::time::interval(interval);
    ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut changes = ChangeTracker::default();
    tracing::info!(format = %reader.format_name(), ?interval, "watching clipboard");

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                let task_reader = Arc::clone(&reader);
                let raw = match tokio::task::spawn_blocking(move || task_reader.read_raw()).await? {
                    Ok(raw) => raw,
                    Err(e) => {
                        tracing::warn!(error = %e, "clipboard read failed");
                        continue;
                    }
                };

                if let Some(outcome) = changes.on_tick(raw) {
                    if let Err(e) = report(outcome, reader.format_name(), output) {
                        tracing::warn!(error = %e, "could not print payload");
                        eprintln!("error: {e}");
                    }
                    println!("--");
                }
            }

            _ = sig_term.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                break;
            }

            _ = sig_int.recv() => {
                tracing::info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    Ok(0)
}

/// Remembers the last payload `watch` saw.
#[derive(Debug, Default)]
struct ChangeTracker {
    last: Option<Vec<u8>>,
}

impl ChangeTracker {
    /// Interpret `raw` if it differs from the previous tick's bytes.
    ///
    /// An empty clipboard is remembered but never reported, so the same
    /// payload copied again after a clear shows up once more.
    fn on_tick(&mut self, raw: Option<Vec<u8>>) -> Option<ReadOutcome> {
        if raw == self.last {
            return None;
        }
        self.last.clone_from(&raw);
        raw.is_some().then(|| SpreadsheetReader::interpret(raw))
    }
}

/// Print an outcome and map it to an exit code.
fn report(outcome: ReadOutcome, format_name: &str, output: OutputMode) -> Result<i32, AppError> {
    match outcome {
        ReadOutcome::Absent => {
            eprintln!("No {format_name:?} content on the clipboard");
            Ok(EXIT_ABSENT)
        }
        ReadOutcome::ParseFailed { reason, payload } => {
            eprintln!("Clipboard {format_name:?} content did not parse: {reason}");
            if !payload.terminator_was_nul() {
                eprintln!("(payload did not end in a NUL byte; its last character was dropped)");
            }
            Ok(EXIT_PARSE_FAILED)
        }
        ReadOutcome::Unavailable(e) => Err(e.into()),
        ReadOutcome::Parsed { document, .. } => {
            match output {
                OutputMode::Tree => print!("{}", format::render_tree(document.root())),
                OutputMode::Tsv => format::print_worksheets(&sheet::worksheets(&document)?),
            }
            Ok(0)
        }
    }
}
