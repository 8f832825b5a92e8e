use std::sync::mpsc::{self, Receiver};
use std::thread;

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PhotoData {
    image: DynamicImage,
}

impl PhotoData {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Outcome of one background image fetch.
pub struct PhotoResult {
    pub url: String,
    pub photo: Result<PhotoData>,
}

pub fn fetch_photo(url: &str) -> Result<PhotoData> {
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("request for image {url} failed"))?
        .error_for_status()
        .with_context(|| format!("image {url} not available"))?;
    let bytes = response
        .bytes()
        .with_context(|| format!("failed to read image body from {url}"))?;
    decode_photo(&bytes)
}

pub fn decode_photo(data: &[u8]) -> Result<PhotoData> {
    let image = image::load_from_memory(data).context("unable to parse card image data")?;
    Ok(PhotoData::new(image))
}

/// Fetch `url` on a background thread.
pub fn spawn_fetch(url: String) -> Receiver<PhotoResult> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        debug!(%url, "fetching card image");
        let photo = fetch_photo(&url);
        if let Err(err) = &photo {
            warn!(%url, "card image unavailable: {err:#}");
        }
        let _ = tx.send(PhotoResult { url, photo });
    });
    rx
}
