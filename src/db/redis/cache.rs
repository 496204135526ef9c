use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::error::{AppError, AppResult};

/// Playlist listings change as videos are added; keep them briefly
const PLAYLIST_TTL_SECS: u64 = 600;
/// Video titles and descriptions rarely change
const VIDEO_TTL_SECS: u64 = 86_400;

/// Cached lookups against the video platform
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    PlaylistItems(String),
    VideoMetadata(String),
}

impl CacheKey {
    /// Expiry applied when this key is written
    pub fn ttl(&self) -> u64 {
        match self {
            CacheKey::PlaylistItems(_) => PLAYLIST_TTL_SECS,
            CacheKey::VideoMetadata(_) => VIDEO_TTL_SECS,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::PlaylistItems(playlist_id) => write!(f, "playlist:{}", playlist_id),
            CacheKey::VideoMetadata(item_id) => write!(f, "video:{}", item_id),
        }
    }
}

pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    Ok(Client::open(redis_url)?)
}

struct PendingWrite {
    key: String,
    json: String,
    ttl: u64,
}

/// Redis-backed JSON cache with fire-and-forget writes
///
/// Reads go straight to Redis. Writes are queued to a single writer task so a
/// slow or unavailable Redis never delays the caller.
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the writer task after flushing queued writes
pub struct CacheWriterHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
    }
}

impl Cache {
    /// Connects to Redis and starts the background writer
    pub async fn connect(client: Client) -> AppResult<(Self, CacheWriterHandle)> {
        let conn = ConnectionManager::new(client).await?;
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(Self::run_writer(conn.clone(), write_rx, shutdown_rx));

        Ok((Self { conn, write_tx }, CacheWriterHandle { shutdown_tx, task }))
    }

    async fn run_writer(
        mut conn: ConnectionManager,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        tracing::debug!("Cache writer started");

        loop {
            tokio::select! {
                Some(write) = write_rx.recv() => Self::write(&mut conn, write).await,
                _ = &mut shutdown_rx => break,
            }
        }

        // Cache clones may still hold senders, so drain without waiting for close
        let mut flushed = 0usize;
        while let Ok(write) = write_rx.try_recv() {
            Self::write(&mut conn, write).await;
            flushed += 1;
        }

        tracing::info!(flushed, "Cache writer stopped");
    }

    async fn write(conn: &mut ConnectionManager, write: PendingWrite) {
        let result: redis::RedisResult<()> = conn.set_ex(&write.key, write.json, write.ttl).await;
        if let Err(e) = result {
            tracing::error!(error = %e, key = %write.key, "Cache write failed");
        }
    }

    /// Cached value for `key`, or `None` on a miss
    pub async fn get_from_cache<T: DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| AppError::Internal(format!("Corrupt cache entry {}: {}", key, e)))
            })
            .transpose()
    }

    /// Queues a write of `value` under `key` with the key's TTL
    pub fn set_in_background<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Cache serialization failed");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            json,
            ttl: key.ttl(),
        };

        if self.write_tx.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_playlist() {
        let key = CacheKey::PlaylistItems("PLabc-123_x".to_string());
        assert_eq!(key.to_string(), "playlist:PLabc-123_x");
    }

    #[test]
    fn test_cache_key_ids_are_case_sensitive() {
        let key = CacheKey::VideoMetadata("dQw4w9WgXcQ".to_string());
        assert_eq!(key.to_string(), "video:dQw4w9WgXcQ");
    }

    #[test]
    fn test_playlists_expire_before_videos() {
        let playlist = CacheKey::PlaylistItems("PL".to_string());
        let video = CacheKey::VideoMetadata("v".to_string());
        assert_eq!(playlist.ttl(), 600);
        assert_eq!(video.ttl(), 86_400);
    }

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_cache_miss() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::connect(client).await.unwrap();

        let key = CacheKey::VideoMetadata("nonexistent_video_12345".to_string());
        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();

        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_queued_write_flushed_on_shutdown() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, handle) = Cache::connect(client.clone()).await.unwrap();

        let key = CacheKey::PlaylistItems("test_shutdown".to_string());
        let value = vec!["v1".to_string(), "v2".to_string()];

        cache.set_in_background(&key, &value);
        handle.shutdown().await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }
}
