//! Single-slot artwork cache
//!
//! Holds exactly one album-art image at a fixed path, keyed by the URL it
//! was fetched from. Re-fetch is skipped while the URL is unchanged; a
//! failed fetch leaves the key unchanged so the same URL retries on the
//! next reconciliation instead of being treated as already cached.

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use reqwest::Client;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

use crate::error::RemoteError;

#[derive(Error, Debug)]
pub enum ArtworkError {
    #[error("Artwork fetch failed: {0}")]
    Fetch(#[from] RemoteError),

    #[error("Artwork decode failed: {0}")]
    Decode(String),

    #[error("Artwork slot write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches raw artwork bytes for a URL
#[async_trait]
pub trait ArtworkFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteError>;
}

pub struct HttpArtworkFetcher {
    client: Client,
}

impl HttpArtworkFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtworkFetcher for HttpArtworkFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "image/*")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Unexpected(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

pub struct ArtworkCache<F> {
    fetcher: F,
    slot: PathBuf,
    last_fetched_url: Option<String>,
}

impl<F: ArtworkFetcher> ArtworkCache<F> {
    pub fn new(fetcher: F, slot: PathBuf) -> Self {
        Self {
            fetcher,
            slot,
            last_fetched_url: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Make sure the slot holds the image at `url`.
    ///
    /// Returns `Ok(Some(decoded))` when a new image was fetched and stored,
    /// `Ok(None)` when the slot already holds this URL. The key is only
    /// advanced after the full fetch-decode-write sequence succeeds.
    pub async fn ensure(&mut self, url: &str) -> Result<Option<DynamicImage>, ArtworkError> {
        if self.last_fetched_url.as_deref() == Some(url) {
            tracing::debug!("Artwork already cached for {}", url);
            return Ok(None);
        }

        // Drop the stale image first; a missing file is fine.
        match fs::remove_file(&self.slot) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!("Fetching artwork from {}", url);
        let bytes = self.fetcher.fetch(url).await?;

        let decoded =
            image::load_from_memory(&bytes).map_err(|e| ArtworkError::Decode(e.to_string()))?;

        fs::write(&self.slot, &bytes)?;
        self.last_fetched_url = Some(url.to_string());

        let (width, height) = decoded.dimensions();
        tracing::debug!("Artwork stored ({} bytes, {}x{})", bytes.len(), width, height);
        Ok(Some(decoded))
    }
}
