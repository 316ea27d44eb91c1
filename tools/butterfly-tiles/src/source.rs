//! Tile sources
//!
//! Fetching returns the raw tile document, or `None` when the source has no
//! data for that tile.

use crate::tile::Tile;
use butterfly_common::{Error, Result};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Public routable tile service.
pub const DEFAULT_BASE_URL: &str = "https://tiles.openplanner.team/planet";

/// Maximum number of retry attempts for network errors
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BASE_RETRY_DELAY_MS: u64 = 1000;

pub trait TileSource: Send + Sync {
    fn fetch(&self, tile: Tile) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(BASE_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff before retry `attempt` (1-based), saturating.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Execute an operation with retry logic for network errors
pub async fn retry_on_network_error<F, Fut, T>(policy: RetryPolicy, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(Error::NetworkError(msg)) if attempt < policy.max_attempts => {
                attempt += 1;
                let delay = policy.backoff_delay(attempt);
                warn!(
                    attempt,
                    error = %msg,
                    delay_ms = delay.as_millis() as u64,
                    "network error, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e), // Non-network errors or max retries exceeded
        }
    }
}

/// Fetches tiles over HTTP from `{base_url}/{z}/{x}/{y}`.
#[derive(Debug, Clone)]
pub struct HttpTileSource {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpTileSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = ClientBuilder::new()
            .tcp_keepalive(Duration::from_secs(60))
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30)) // Overall request timeout
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("butterfly-tiles/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self, tile: Tile) -> String {
        tile.url(&self.base_url)
    }

    async fn fetch_once(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/ld+json, application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_server_error() {
            // Treated like a dropped connection so the request is retried
            return Err(Error::NetworkError(format!("{status} from {url}")));
        }
        if !status.is_success() {
            return Err(Error::HttpError(format!("{status} from {url}")));
        }

        let bytes = response.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }
}

impl TileSource for HttpTileSource {
    async fn fetch(&self, tile: Tile) -> Result<Option<Vec<u8>>> {
        let url = self.url(tile);
        debug!(tile = %tile, url = %url, "fetching tile");
        retry_on_network_error(self.retry, || self.fetch_once(&url)).await
    }
}

/// Caches another source's tiles as `{z}_{x}_{y}.json` files.
///
/// Missing tiles are not cached and are requested again on the next load.
#[derive(Debug, Clone)]
pub struct CachedTileSource<S> {
    inner: S,
    dir: PathBuf,
}

impl<S: TileSource> CachedTileSource<S> {
    pub fn new(inner: S, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cache_path(&self, tile: Tile) -> PathBuf {
        self.dir
            .join(format!("{}_{}_{}.json", tile.zoom, tile.x, tile.y))
    }
}

impl<S: TileSource> TileSource for CachedTileSource<S> {
    async fn fetch(&self, tile: Tile) -> Result<Option<Vec<u8>>> {
        let path = self.cache_path(tile);
        if tokio::fs::try_exists(&path).await? {
            debug!(tile = %tile, path = %path.display(), "tile cache hit");
            return Ok(Some(tokio::fs::read(&path).await?));
        }

        let fetched = self.inner.fetch(tile).await?;
        if let Some(bytes) = &fetched {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&path, bytes).await?;
        }
        Ok(fetched)
    }
}

/// Serves tiles from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTileSource {
    tiles: HashMap<Tile, Vec<u8>>,
}

impl MemoryTileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tile: Tile, bytes: impl Into<Vec<u8>>) {
        self.tiles.insert(tile, bytes.into());
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl TileSource for MemoryTileSource {
    async fn fetch(&self, tile: Tile) -> Result<Option<Vec<u8>>> {
        Ok(self.tiles.get(&tile).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_retry_exponential_backoff() {
        let call_count = Arc::new(AtomicUsize::new(0));

        let result = retry_on_network_error(fast_retry(), || {
            let count_clone = Arc::clone(&call_count);
            async move {
                let call_num = count_clone.fetch_add(1, Ordering::SeqCst) + 1;
                if call_num <= 2 {
                    Err(Error::NetworkError("Simulated network failure".to_string()))
                } else {
                    Ok("success")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_delay_saturates() {
        let policy = RetryPolicy {
            max_attempts: 100,
            base_delay: Duration::from_millis(10),
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(10));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(40));
        assert_eq!(
            policy.backoff_delay(40),
            Duration::from_millis(10).saturating_mul(u32::MAX)
        );

        let huge = RetryPolicy {
            max_attempts: 100,
            base_delay: Duration::MAX,
        };
        assert_eq!(huge.backoff_delay(2), Duration::MAX);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let call_count = Arc::new(AtomicUsize::new(0));

        let result: Result<()> = retry_on_network_error(fast_retry(), || {
            let count_clone = Arc::clone(&call_count);
            async move {
                count_clone.fetch_add(1, Ordering::SeqCst);
                Err(Error::NetworkError("down".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::NetworkError(_))));
        assert_eq!(call_count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_skips_other_errors() {
        let call_count = Arc::new(AtomicUsize::new(0));

        let result: Result<()> = retry_on_network_error(fast_retry(), || {
            let count_clone = Arc::clone(&call_count);
            async move {
                count_clone.fetch_add(1, Ordering::SeqCst);
                Err(Error::HttpError("403 Forbidden".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::HttpError(_))));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_memory_source() {
        let mut source = MemoryTileSource::new();
        let tile = Tile::new(14, 1, 2);
        source.insert(tile, b"{}".to_vec());

        assert_eq!(source.fetch(tile).await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(source.fetch(Tile::new(14, 1, 3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cache_writes_and_serves() {
        let dir = TempDir::new().unwrap();
        let tile = Tile::new(14, 8392, 5469);
        let mut inner = MemoryTileSource::new();
        inner.insert(tile, b"tile".to_vec());

        let cached = CachedTileSource::new(inner, dir.path().join("cache"));
        assert_eq!(cached.fetch(tile).await.unwrap(), Some(b"tile".to_vec()));

        let path = dir.path().join("cache").join("14_8392_5469.json");
        assert_eq!(cached.cache_path(tile), path);
        assert_eq!(std::fs::read(&path).unwrap(), b"tile");

        // Served from disk even once the inner source forgets the tile
        let from_disk = CachedTileSource::new(MemoryTileSource::new(), dir.path().join("cache"));
        assert_eq!(from_disk.fetch(tile).await.unwrap(), Some(b"tile".to_vec()));

        assert_eq!(from_disk.fetch(Tile::new(14, 0, 0)).await.unwrap(), None);
        assert!(!dir.path().join("cache").join("14_0_0.json").exists());
    }
}
