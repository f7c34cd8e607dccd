//! Tag image download into scratch storage
//!
//! A downloaded image lives in a [`ScratchImage`], which deletes the file when
//! dropped. Whatever happens during upload, the file is gone once the guard
//! goes out of scope.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::{GenericImageView, ImageFormat};
use uuid::Uuid;

use crate::error::{MediaError, Result};

/// Scratch file owned by the publishing step
#[derive(Debug)]
pub struct ScratchImage {
    path: PathBuf,
}

impl ScratchImage {
    /// Take ownership of `path`; the file is removed when the guard drops
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchImage {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed scratch image {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove scratch image {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download the image at `url` into a scratch file
    async fn fetch(&self, url: &str) -> Result<ScratchImage>;
}

/// Downloads over HTTP and scales oversized images down before saving
pub struct HttpMediaFetcher {
    client: reqwest::Client,
    scratch_dir: PathBuf,
    max_dimension: u32,
}

impl HttpMediaFetcher {
    pub fn new(scratch_dir: PathBuf, max_dimension: u32, timeout: Duration) -> Result<Self> {
        let client = crate::http::client(timeout).map_err(|e| MediaError::Download {
            url: String::new(),
            reason: format!("could not build HTTP client: {}", e),
        })?;
        Ok(Self {
            client,
            scratch_dir,
            max_dimension,
        })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<ScratchImage> {
        let download_error = |reason: String| MediaError::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("HTTP {}", status.as_u16())).into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        let format = image::guess_format(&bytes).map_err(|e| MediaError::Decode(e.to_string()))?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let image = ScratchImage::new(
            self.scratch_dir
                .join(format!("biketag-{}.{}", Uuid::new_v4(), extension)),
        );

        let path = image.path().to_path_buf();
        let max_dimension = self.max_dimension;
        tokio::task::spawn_blocking(move || save_fitted(&bytes, format, max_dimension, &path))
            .await
            .map_err(|e| MediaError::Decode(format!("image task failed: {}", e)))??;

        tracing::debug!("Saved {} to {}", url, image.path().display());
        Ok(image)
    }
}

/// Write `bytes` to `path`, scaling down to fit `max_dimension` when larger
///
/// Images that already fit are written byte-for-byte.
fn save_fitted(
    bytes: &[u8],
    format: ImageFormat,
    max_dimension: u32,
    path: &Path,
) -> std::result::Result<(), MediaError> {
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| MediaError::Decode(e.to_string()))?;
    let (width, height) = decoded.dimensions();

    if width <= max_dimension && height <= max_dimension {
        std::fs::write(path, bytes)?;
        return Ok(());
    }

    tracing::debug!(
        "Scaling {}x{} image to fit {}px",
        width,
        height,
        max_dimension
    );
    decoded
        .thumbnail(max_dimension, max_dimension)
        .save_with_format(path, format)
        .map_err(|e| MediaError::Decode(e.to_string()))?;
    Ok(())
}
