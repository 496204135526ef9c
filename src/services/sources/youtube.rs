/// YouTube source provider
///
/// Metadata, comments and playlist listings come from the YouTube Data API v3.
/// Captions are not downloadable through the Data API with an API key, so the
/// caption track list is read from the player endpoint and the chosen track is
/// fetched as timed text.
///
/// API Flow:
/// 1. Playlist: /playlistItems?part=contentDetails → video ids, 50 per page
/// 2. Metadata: /videos?part=snippet → title + description
/// 3. Comments: /commentThreads?part=snippet&order=relevance → top comments
/// 4. Captions: /youtubei/v1/player → caption tracks → timed text (json3)
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult, FetchError, FetchResult},
    models::{ApiCommentThread, ApiListResponse, ApiPlaylistItem, ApiVideo, VideoMetadata},
    services::sources::{
        captions::{self, Json3Transcript, PlayerResponse},
        PlaylistResolver, VideoSource,
    },
};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde_json::json;
use std::time::Duration;

const PLAYLIST_PAGE_SIZE: &str = "50";
const COMMENT_SEPARATOR: &str = " | ";
const PLAYLIST_UNAVAILABLE: &str = "Could not load playlist";

const PLAYER_CLIENT_NAME: &str = "ANDROID";
const PLAYER_CLIENT_VERSION: &str = "20.10.38";

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Removes HTML tags from a comment's display text
fn strip_markup(text: &str) -> String {
    MARKUP_TAG.replace_all(text, "").into_owned()
}

/// Maps a failed `playlistItems` call; unknown or malformed ids are the caller's input problem
fn playlist_error(playlist_id: &str, status: StatusCode, body: &str) -> AppError {
    if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
        tracing::info!(playlist_id = %playlist_id, status = %status, "Playlist could not be loaded");
        return AppError::InvalidInput(PLAYLIST_UNAVAILABLE.to_string());
    }

    tracing::error!(playlist_id = %playlist_id, status = %status, body = %body, "Playlist request failed");
    AppError::ExternalApi(format!("YouTube API returned status {} for playlist", status))
}

#[derive(Clone)]
pub struct YouTubeClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    web_url: String,
    caption_languages: Vec<String>,
    cache: Cache,
}

impl YouTubeClient {
    pub fn new(
        cache: Cache,
        api_key: String,
        api_url: String,
        web_url: String,
        caption_languages: Vec<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
            web_url,
            caption_languages,
            cache,
        })
    }

    /// Maps a non-success Data API response to a fetch error
    async fn check_response(response: Response, what: &str) -> FetchResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(what.to_string()));
        }

        Err(FetchError::Upstream(format!(
            "YouTube API returned status {} for {}: {}",
            status, what, body
        )))
    }

    async fn request_metadata(&self, item_id: &str) -> FetchResult<VideoMetadata> {
        let url = format!("{}/videos", self.api_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("id", item_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let response = Self::check_response(response, &format!("video {}", item_id)).await?;
        let page: ApiListResponse<ApiVideo> = response.json().await?;

        page.items
            .into_iter()
            .next()
            .map(|video| video.into_metadata(item_id))
            .ok_or_else(|| FetchError::NotFound(format!("video {}", item_id)))
    }

    async fn request_playlist_items(&self, playlist_id: &str) -> AppResult<Vec<String>> {
        let url = format!("{}/playlistItems", self.api_url);
        let mut video_ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("part", "contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", PLAYLIST_PAGE_SIZE),
                ("key", self.api_key.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response = self.http_client.get(&url).query(&query).send().await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(playlist_error(playlist_id, status, &body));
            }

            let page: ApiListResponse<ApiPlaylistItem> = response.json().await?;
            video_ids.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.content_details.and_then(|d| d.video_id)),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::info!(
            playlist_id = %playlist_id,
            items = video_ids.len(),
            "Playlist resolved"
        );

        Ok(video_ids)
    }

    async fn request_player(&self, item_id: &str) -> FetchResult<PlayerResponse> {
        let url = format!("{}/youtubei/v1/player", self.web_url);
        let body = json!({
            "context": {
                "client": {
                    "clientName": PLAYER_CLIENT_NAME,
                    "clientVersion": PLAYER_CLIENT_VERSION,
                }
            },
            "videoId": item_id,
        });

        let response = self.http_client.post(&url).json(&body).send().await?;
        let response = Self::check_response(response, &format!("player for {}", item_id)).await?;

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl VideoSource for YouTubeClient {
    async fn fetch_metadata(&self, item_id: &str) -> FetchResult<VideoMetadata> {
        cached!(
            self.cache,
            CacheKey::VideoMetadata(item_id.to_string()),
            async move { self.request_metadata(item_id).await }
        )
    }

    async fn fetch_captions(&self, item_id: &str) -> FetchResult<String> {
        let player = self.request_player(item_id).await?;
        let tracks = captions::caption_tracks(player, item_id)?;

        let track = captions::select_track(&tracks, &self.caption_languages).ok_or_else(|| {
            FetchError::NotFound(format!(
                "captions in {:?} for {}",
                self.caption_languages, item_id
            ))
        })?;

        tracing::info!(
            item_id = %item_id,
            language = %track.language_code,
            generated = track.is_generated(),
            "Caption track selected"
        );

        let response = self
            .http_client
            .get(captions::json3_url(&track.base_url))
            .send()
            .await?;
        let response = Self::check_response(response, &format!("captions for {}", item_id)).await?;

        let transcript: Json3Transcript = response.json().await?;
        let text = captions::transcript_text(transcript);

        if text.is_empty() {
            return Err(FetchError::NotFound(format!("caption text for {}", item_id)));
        }

        tracing::info!(item_id = %item_id, chars = text.chars().count(), "Captions fetched");

        Ok(text)
    }

    async fn fetch_top_comments(&self, item_id: &str, limit: u32) -> FetchResult<String> {
        let url = format!("{}/commentThreads", self.api_url);
        let max_results = limit.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("videoId", item_id),
                ("maxResults", max_results.as_str()),
                ("order", "relevance"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let response = Self::check_response(response, &format!("comments for {}", item_id)).await?;
        let page: ApiListResponse<ApiCommentThread> = response.json().await?;

        let comments: Vec<String> = page
            .items
            .into_iter()
            .take(limit as usize)
            .map(|thread| strip_markup(&thread.snippet.top_level_comment.snippet.text_display))
            .collect();

        if comments.is_empty() {
            return Err(FetchError::NotFound(format!("comments for {}", item_id)));
        }

        tracing::info!(item_id = %item_id, count = comments.len(), "Comments fetched");

        Ok(comments.join(COMMENT_SEPARATOR))
    }
}

#[async_trait::async_trait]
impl PlaylistResolver for YouTubeClient {
    async fn list_items(&self, playlist_id: &str) -> AppResult<Vec<String>> {
        cached!(
            self.cache,
            CacheKey::PlaylistItems(playlist_id.to_string()),
            async move { self.request_playlist_items(playlist_id).await }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("Add <b>more</b> garlic<br>next time"),
            "Add more garlicnext time"
        );
    }

    #[test]
    fn test_unknown_playlist_is_invalid_input() {
        for status in [StatusCode::NOT_FOUND, StatusCode::BAD_REQUEST] {
            match playlist_error("PLmissing", status, "{\"error\": {}}") {
                AppError::InvalidInput(msg) => assert_eq!(msg, "Could not load playlist"),
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn test_playlist_upstream_failure_stays_external() {
        let err = playlist_error("PLx", StatusCode::FORBIDDEN, "quotaExceeded");
        assert!(matches!(err, AppError::ExternalApi(_)));
    }

    #[test]
    fn test_strip_markup_keeps_plain_text() {
        assert_eq!(strip_markup("2 tbsp soy sauce"), "2 tbsp soy sauce");
    }

    #[test]
    fn test_comment_thread_deserialization() {
        let json = r#"{
            "items": [
                {"snippet": {"topLevelComment": {"snippet": {"textDisplay": "Needs <i>sesame oil</i>"}}}},
                {"snippet": {"topLevelComment": {"snippet": {"textDisplay": "Tried it!"}}}}
            ]
        }"#;

        let page: ApiListResponse<ApiCommentThread> = serde_json::from_str(json).unwrap();
        let joined = page
            .items
            .into_iter()
            .map(|t| strip_markup(&t.snippet.top_level_comment.snippet.text_display))
            .collect::<Vec<_>>()
            .join(COMMENT_SEPARATOR);

        assert_eq!(joined, "Needs sesame oil | Tried it!");
    }
}
