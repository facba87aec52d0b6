//! Remote asset fetcher
//!
//! Streams a remote audio resource to local storage so the decoder can read
//! it like any other file. Every download gets a unique UUID-suffixed file
//! name, so overlapping downloads never collide; after a success the
//! previous download's file is removed so local storage holds only the
//! latest track.

use std::path::PathBuf;
use std::sync::Mutex;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Log a progress line roughly every this many bytes
const PROGRESS_INTERVAL: u64 = 1024 * 1024;

/// Downloads remote audio resources to a local directory.
pub struct AssetFetcher {
    client: reqwest::Client,
    download_dir: PathBuf,
    /// Most recent successful download, removed when superseded
    last_download: Mutex<Option<PathBuf>>,
}

impl AssetFetcher {
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            download_dir,
            last_download: Mutex::new(None),
        }
    }

    /// Download `url` to a fresh local file.
    ///
    /// # Returns
    /// Path of the downloaded file, ready for decoding.
    ///
    /// # Errors
    /// Request failure, non-success status, or local write failure. A
    /// partially written file is removed best-effort before returning.
    pub async fn fetch(&self, url: &str) -> Result<PathBuf> {
        info!("Downloading {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Download(format!("request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| Error::Download(format!("server error: {}", e)))?;

        let total = response.content_length();
        let path = self.target_path(url);

        tokio::fs::create_dir_all(&self.download_dir).await?;

        match self.write_body(response, &path, total).await {
            Ok(received) => {
                info!("Downloaded {} bytes to {}", received, path.display());

                // Only the latest track needs to stay on disk
                let previous = self.last_download.lock().unwrap().replace(path.clone());
                if let Some(previous) = previous {
                    if previous != path {
                        if let Err(e) = std::fs::remove_file(&previous) {
                            debug!(
                                "Could not remove previous download {}: {}",
                                previous.display(),
                                e
                            );
                        }
                    }
                }

                Ok(path)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                    debug!(
                        "Could not remove partial download {}: {}",
                        path.display(),
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    async fn write_body(
        &self,
        mut response: reqwest::Response,
        path: &PathBuf,
        total: Option<u64>,
    ) -> Result<u64> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut received: u64 = 0;
        let mut next_report = PROGRESS_INTERVAL;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Download(format!("transfer failed: {}", e)))?
        {
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            if received >= next_report {
                match total {
                    Some(total) if total > 0 => {
                        debug!(
                            "Download progress: {}/{} bytes ({:.0}%)",
                            received,
                            total,
                            received as f64 / total as f64 * 100.0
                        );
                    }
                    _ => debug!("Download progress: {} bytes", received),
                }
                next_report += PROGRESS_INTERVAL;
            }
        }

        file.flush().await?;
        Ok(received)
    }

    /// Unique local path for a download, keeping a recognizable extension
    /// when the URL has one so the decoder's format hint works.
    fn target_path(&self, url: &str) -> PathBuf {
        let extension = url
            .split(&['?', '#'][..])
            .next()
            .and_then(|base| base.rsplit('/').next())
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("audio");

        self.download_dir
            .join(format!("track-{}.{}", Uuid::new_v4(), extension))
    }
}
