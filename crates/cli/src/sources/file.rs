//! Receipt stored on the local filesystem

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subwatch_core::config::ReceiptConfig;
use subwatch_core::{ProviderError, ReceiptSource};

const DOWNLOAD_TIMEOUT_SECS: u64 = 10;

/// Reads the receipt from a file; a refresh re-downloads it from `refresh_url`.
///
/// Clones share the digest of the last receipt this source wrote, so a file
/// watcher can tell its own writes from outside changes.
#[derive(Debug, Clone)]
pub struct FileReceiptSource {
    path: PathBuf,
    refresh_url: Option<String>,
    client: reqwest::Client,
    last_written: Arc<Mutex<Option<Vec<u8>>>>,
}

impl FileReceiptSource {
    pub fn new(path: impl Into<PathBuf>, refresh_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            path: path.into(),
            refresh_url,
            client,
            last_written: Arc::default(),
        })
    }

    pub fn from_config(config: &ReceiptConfig) -> Result<Self> {
        Self::new(&config.path, config.refresh_url.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the receipt file and remembers what was written.
    pub async fn store(&self, data: &[u8]) -> Result<(), ProviderError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ProviderError::Io(e.to_string()))?;
        }
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|e| ProviderError::Io(format!("{}: {}", self.path.display(), e)))?;
        *self.written() = Some(digest(data));
        Ok(())
    }

    /// Whether the file still holds exactly what [`store`](Self::store) last wrote.
    pub async fn is_own_write(&self) -> bool {
        let Some(expected) = self.written().clone() else {
            return false;
        };
        match tokio::fs::read(&self.path).await {
            Ok(data) => digest(&data) == expected,
            Err(_) => false,
        }
    }

    fn written(&self) -> std::sync::MutexGuard<'_, Option<Vec<u8>>> {
        self.last_written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::RefreshFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ProviderError::RefreshFailed(format!(
                "HTTP {}",
                resp.status()
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| ProviderError::RefreshFailed(e.to_string()))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl ReceiptSource for FileReceiptSource {
    async fn read(&self) -> Result<Vec<u8>, ProviderError> {
        match tokio::fs::read(&self.path).await {
            Ok(data) if data.is_empty() => Err(ProviderError::Empty),
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ProviderError::NotFound(self.path.display().to_string()))
            }
            Err(e) => Err(ProviderError::Io(format!("{}: {}", self.path.display(), e))),
        }
    }

    async fn request_refresh(&self) -> Result<(), ProviderError> {
        let url = self
            .refresh_url
            .as_deref()
            .ok_or_else(|| ProviderError::RefreshFailed("no refresh_url configured".into()))?;

        tracing::debug!(url, path = %self.path.display(), "downloading receipt");
        let data = self.download(url).await?;
        self.store(&data).await
    }
}

fn digest(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}
