use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod recipe;
pub mod recommendation;
pub mod run;

pub use recipe::{NewRecipe, Recipe};
pub use recommendation::{RecipeMatch, RecommendationOutcome};
pub use run::{ItemOutcome, ItemStatus, RunStatus, RunSummary};

/// Sentinel stored in `data_sources` when no source contributed
pub const NO_SOURCES: &str = "none";

/// Canonical watch URL for a video id
pub fn watch_url(item_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", item_id)
}

/// Metadata for a single playlist item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoMetadata {
    pub item_id: String,
    pub title: String,
    pub description: String,
    pub url: String,
}

/// One of the independently optional text sources fed to inference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Captions,
    Description,
    Comments,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Captions => "captions",
            SourceKind::Description => "description",
            SourceKind::Comments => "comments",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Renders the provenance column: comma-joined kinds, or the `none` sentinel
pub fn format_data_sources(sources: &[SourceKind]) -> String {
    if sources.is_empty() {
        return NO_SOURCES.to_string();
    }

    sources
        .iter()
        .map(SourceKind::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

// ============================================================================
// YouTube Data API Types
// ============================================================================

/// Generic `{ "items": [...] }` list envelope returned by the Data API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// `videos.list` item (part=snippet)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiVideo {
    pub snippet: ApiVideoSnippet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiVideoSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// `playlistItems.list` item (part=contentDetails)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPlaylistItem {
    #[serde(default)]
    pub content_details: Option<ApiPlaylistItemDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPlaylistItemDetails {
    #[serde(default)]
    pub video_id: Option<String>,
}

/// `commentThreads.list` item (part=snippet)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCommentThread {
    pub snippet: ApiCommentThreadSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCommentThreadSnippet {
    pub top_level_comment: ApiComment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiComment {
    pub snippet: ApiCommentSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCommentSnippet {
    #[serde(default)]
    pub text_display: String,
}

impl ApiVideo {
    pub fn into_metadata(self, item_id: &str) -> VideoMetadata {
        VideoMetadata {
            item_id: item_id.to_string(),
            title: self.snippet.title,
            description: self.snippet.description,
            url: watch_url(item_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("dQw4w9WgXcQ"), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_format_data_sources_empty_uses_sentinel() {
        assert_eq!(format_data_sources(&[]), "none");
    }

    #[test]
    fn test_format_data_sources_keeps_order() {
        let sources = [SourceKind::Captions, SourceKind::Comments];
        assert_eq!(format_data_sources(&sources), "captions,comments");
    }

    #[test]
    fn test_source_kind_serde() {
        let json = serde_json::to_string(&SourceKind::Description).unwrap();
        assert_eq!(json, r#""description""#);
    }

    #[test]
    fn test_video_deserialization_without_description() {
        let json = r#"{"snippet": {"title": "Kimchi Stew"}}"#;
        let video: ApiVideo = serde_json::from_str(json).unwrap();
        let metadata = video.into_metadata("abc123");

        assert_eq!(metadata.title, "Kimchi Stew");
        assert_eq!(metadata.description, "");
        assert_eq!(metadata.url, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_playlist_page_deserialization() {
        let json = r#"{
            "nextPageToken": "CAUQAA",
            "items": [
                {"contentDetails": {"videoId": "v1"}},
                {"contentDetails": {}},
                {"snippet": {}}
            ]
        }"#;

        let page: ApiListResponse<ApiPlaylistItem> = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
        let ids: Vec<String> = page
            .items
            .into_iter()
            .filter_map(|i| i.content_details.and_then(|d| d.video_id))
            .collect();
        assert_eq!(ids, vec!["v1"]);
    }
}
