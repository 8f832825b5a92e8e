//! Breed data sources.
//!
//! This module provides:
//! - `BreedSource` trait for abstracting where the breed list comes from
//! - `HttpSource` fetching the JSON array over HTTP
//! - `FileSource` reading the same JSON from disk
//! - `load_breeds` / `spawn_load`, which never fail: errors are logged and
//!   yield an empty list

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use thiserror::Error;
use tracing::{error, info};

use crate::breed::{dedup_by_name, BreedRecord};

/// Default breed endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://freetestapi.com/api/v1/dogs";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("response from {origin} is not a list of breeds: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Somewhere a breed list can be fetched from.
pub trait BreedSource: Send {
    /// Human-readable origin, used in log lines.
    fn describe(&self) -> String;

    /// Fetch and parse the raw (not yet deduplicated) breed list.
    fn fetch(&self) -> Result<Vec<BreedRecord>, LoadError>;
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl BreedSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<Vec<BreedRecord>, LoadError> {
        let http = |source: reqwest::Error| LoadError::Http {
            url: self.url.clone(),
            source,
        };
        let response = reqwest::blocking::get(&self.url).map_err(http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: self.url.clone(),
                status,
            });
        }
        let body = response.text().map_err(http)?;
        parse_breeds(&body, &self.url)
    }
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BreedSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<BreedRecord>, LoadError> {
        let body = fs::read_to_string(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_breeds(&body, &self.describe())
    }
}

/// Pick a source for a `--source` argument: URLs go over HTTP, anything else
/// is read as a file path.
pub fn source_for(location: &str) -> Box<dyn BreedSource> {
    let lower = location.trim_start().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Box::new(HttpSource::new(location.trim()))
    } else {
        Box::new(FileSource::new(location))
    }
}

pub fn parse_breeds(body: &str, origin: &str) -> Result<Vec<BreedRecord>, LoadError> {
    serde_json::from_str(body).map_err(|source| LoadError::Parse {
        origin: origin.to_string(),
        source,
    })
}

/// Fetch once, deduplicate by name, and fall back to an empty list on error.
pub fn load_breeds(source: &dyn BreedSource) -> Vec<BreedRecord> {
    match source.fetch() {
        Ok(records) => {
            let fetched = records.len();
            let breeds = dedup_by_name(records);
            info!(
                origin = %source.describe(),
                fetched,
                stored = breeds.len(),
                "loaded breed list"
            );
            breeds
        }
        Err(err) => {
            error!(origin = %source.describe(), "error fetching breeds: {err}");
            Vec::new()
        }
    }
}

/// Run [`load_breeds`] on a background thread.
///
/// The receiver yields exactly one list. Dropping it before the load finishes
/// discards the result.
pub fn spawn_load(source: Box<dyn BreedSource>) -> Receiver<Vec<BreedRecord>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let breeds = load_breeds(source.as_ref());
        // Receiver gone means the UI already exited.
        let _ = tx.send(breeds);
    });
    rx
}
