use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use directories::BaseDirs;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_SUBDIR: &str = "breedsearch";
const LOG_FILE_NAME: &str = "breedsearch.log";

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Plain stderr, for one-shot commands.
    Stderr,
    /// Append to the log file; the terminal belongs to the UI.
    File,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn log_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine cache directory")?;
    Ok(base.cache_dir().join(LOG_SUBDIR))
}

fn open_log_file(dir: &Path) -> Result<(PathBuf, File)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log dir: {}", dir.display()))?;
    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok((path, file))
}

/// Writer for UI logs. An unusable log file disables logging instead of failing startup.
fn file_writer(dir: Result<PathBuf>) -> (BoxMakeWriter, Option<PathBuf>) {
    match dir.and_then(|dir| open_log_file(&dir)) {
        Ok((path, file)) => (BoxMakeWriter::new(Mutex::new(file)), Some(path)),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            (BoxMakeWriter::new(io::sink), None)
        }
    }
}

/// Install the global subscriber. Returns the log file path when logging to a file.
pub fn init(target: LogTarget) -> Result<Option<PathBuf>> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_target(false).with_writer(io::stderr))
                .try_init()
                .context("failed to install log subscriber")?;
            Ok(None)
        }
        LogTarget::File => {
            let (writer, path) = file_writer(log_dir());
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .context("failed to install log subscriber")?;
            Ok(path)
        }
    }
}
