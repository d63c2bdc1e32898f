use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use silksong_core::{StatusFetcher, TransportError};

/// The single most recent payload fetched from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadCache {
    pub product_id: String,
    pub payload: String,
    pub fetched_at: DateTime<Utc>,
}

impl PayloadCache {
    pub fn load_from_path(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&data).ok()
    }

    pub fn save_to_path(&self, path: &Path) -> std::io::Result<()> {
        let data = serde_json::to_vec(self)?;
        write_atomic(path, &data)
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "cache path has no parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("cache");
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let pid = std::process::id();

    let mut tmp_path = None;
    for attempt in 0..16_u8 {
        let candidate = parent.join(format!(".{file_name}.{pid}.{timestamp}.{attempt}.tmp"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(data)?;
                file.sync_all()?;
                tmp_path = Some(candidate);
                break;
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    let Some(tmp_path) = tmp_path else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "failed to create unique cache temp file",
        ));
    };

    if let Err(error) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(error);
    }

    Ok(())
}

/// Passes fetches through and remembers the last successful payload on disk.
pub struct CachingFetcher<F> {
    inner: F,
    cache_path: PathBuf,
}

impl<F> CachingFetcher<F> {
    pub fn new(inner: F, cache_path: PathBuf) -> Self {
        Self { inner, cache_path }
    }
}

#[async_trait]
impl<F: StatusFetcher> StatusFetcher for CachingFetcher<F> {
    async fn fetch(&self, product_id: &str) -> Result<String, TransportError> {
        let payload = self.inner.fetch(product_id).await?;

        let cache = PayloadCache {
            product_id: product_id.to_string(),
            payload: payload.clone(),
            fetched_at: Utc::now(),
        };
        let cache_path = self.cache_path.clone();
        match tokio::task::spawn_blocking(move || cache.save_to_path(&cache_path)).await {
            Ok(Ok(())) => debug!("Cached payload for app {product_id}"),
            Ok(Err(error)) => warn!("Failed to cache payload for app {product_id}: {error}"),
            Err(error) => warn!("Payload cache task failed: {error}"),
        }

        Ok(payload)
    }
}

/// Serves the cached payload instead of touching the network.
pub struct OfflineFetcher {
    cache_path: PathBuf,
}

impl OfflineFetcher {
    pub fn new(cache_path: PathBuf) -> Self {
        Self { cache_path }
    }
}

#[async_trait]
impl StatusFetcher for OfflineFetcher {
    async fn fetch(&self, product_id: &str) -> Result<String, TransportError> {
        let cache = PayloadCache::load_from_path(&self.cache_path).ok_or_else(|| {
            TransportError::Unavailable {
                reason: format!("no cached payload at {}", self.cache_path.display()),
            }
        })?;

        if cache.product_id != product_id {
            return Err(TransportError::Unavailable {
                reason: format!(
                    "cached payload is for app {}, not app {product_id}",
                    cache.product_id
                ),
            });
        }

        debug!(
            "Using cached payload for app {product_id} from {}",
            cache.fetched_at
        );
        Ok(cache.payload)
    }
}
