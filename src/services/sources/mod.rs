/// Video data sources
///
/// Each fetcher is independently optional: an item can be turned into a recipe
/// from any subset of captions, description and comments. Fetchers never panic
/// on missing data; absence is an explicit `FetchError` variant the item
/// processor matches on.
use crate::{
    error::{AppResult, FetchResult},
    models::VideoMetadata,
};

pub mod captions;
pub mod youtube;

pub use youtube::YouTubeClient;

/// Per-video retrieval of the inputs used for recipe extraction
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VideoSource: Send + Sync {
    /// Title, description and canonical URL of a video
    async fn fetch_metadata(&self, item_id: &str) -> FetchResult<VideoMetadata>;

    /// Caption text in timeline order; manual tracks win over auto-generated ones
    async fn fetch_captions(&self, item_id: &str) -> FetchResult<String>;

    /// Up to `limit` top comments by relevance, markup stripped, joined with ` | `
    async fn fetch_top_comments(&self, item_id: &str, limit: u32) -> FetchResult<String>;
}

/// Resolves a playlist id into its ordered video ids
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlaylistResolver: Send + Sync {
    async fn list_items(&self, playlist_id: &str) -> AppResult<Vec<String>>;
}
