//! Caption track discovery and transcript decoding.
//!
//! Tracks are listed through the player endpoint; the chosen track is then
//! downloaded in the `json3` timed-text format and flattened into plain text.

use serde::Deserialize;

use crate::error::{FetchError, FetchResult};

/// Subset of the player response needed for caption discovery
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    #[serde(default)]
    pub playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    pub captions: Option<PlayerCaptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayabilityStatus {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCaptions {
    #[serde(default)]
    pub player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracklistRenderer {
    #[serde(default)]
    pub caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` for automatically generated tracks
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Extracts the caption tracks from a player response
///
/// An unplayable video or one without a caption renderer is reported as
/// `TranscriptUnavailable`; a renderer with no tracks is `NotFound`.
pub fn caption_tracks(response: PlayerResponse, item_id: &str) -> FetchResult<Vec<CaptionTrack>> {
    if let Some(playability) = &response.playability_status {
        if playability.status != "OK" {
            return Err(FetchError::TranscriptUnavailable(format!(
                "video {} unavailable ({}): {}",
                item_id,
                playability.status,
                playability.reason.as_deref().unwrap_or("no reason given")
            )));
        }
    }

    let tracks = response
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .ok_or_else(|| {
            FetchError::TranscriptUnavailable(format!("captions disabled for {}", item_id))
        })?
        .caption_tracks;

    if tracks.is_empty() {
        return Err(FetchError::NotFound(format!("captions for {}", item_id)));
    }

    Ok(tracks)
}

/// Picks the caption track to download
///
/// Manually authored tracks are tried first, walking `languages` in priority
/// order; auto-generated tracks in the same order are the fallback.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    let find = |generated: bool| {
        languages.iter().find_map(|lang| {
            tracks
                .iter()
                .find(|t| t.is_generated() == generated && &t.language_code == lang)
        })
    };

    find(false).or_else(|| find(true))
}

/// Rewrites a track's base URL to request the `json3` format
pub fn json3_url(base_url: &str) -> String {
    let trimmed = base_url.replace("&fmt=srv3", "");
    format!("{}&fmt=json3", trimmed)
}

/// Timed-text document in `json3` format
#[derive(Debug, Clone, Deserialize)]
pub struct Json3Transcript {
    #[serde(default)]
    pub events: Vec<Json3Event>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Json3Event {
    #[serde(default)]
    pub t_start_ms: u64,
    #[serde(default)]
    pub segs: Vec<Json3Segment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Json3Segment {
    #[serde(default)]
    pub utf8: String,
}

/// Joins caption fragments in timeline order into one text blob
pub fn transcript_text(mut transcript: Json3Transcript) -> String {
    transcript.events.sort_by_key(|e| e.t_start_ms);

    transcript
        .events
        .iter()
        .map(|event| {
            event
                .segs
                .iter()
                .map(|s| s.utf8.as_str())
                .collect::<String>()
                .replace('\n', " ")
        })
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(lang: &str, generated: bool) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://example.test/timedtext?lang={}", lang),
            language_code: lang.to_string(),
            kind: generated.then(|| "asr".to_string()),
        }
    }

    fn langs() -> Vec<String> {
        vec!["ko".to_string(), "en".to_string()]
    }

    #[test]
    fn test_manual_track_preferred_over_generated() {
        let tracks = vec![track("ko", true), track("en", false)];
        let chosen = select_track(&tracks, &langs()).unwrap();
        assert_eq!(chosen.language_code, "en");
        assert!(!chosen.is_generated());
    }

    #[test]
    fn test_manual_tracks_follow_language_priority() {
        let tracks = vec![track("en", false), track("ko", false)];
        let chosen = select_track(&tracks, &langs()).unwrap();
        assert_eq!(chosen.language_code, "ko");
    }

    #[test]
    fn test_generated_fallback() {
        let tracks = vec![track("ja", false), track("en", true)];
        let chosen = select_track(&tracks, &langs()).unwrap();
        assert_eq!(chosen.language_code, "en");
        assert!(chosen.is_generated());
    }

    #[test]
    fn test_no_track_in_requested_languages() {
        let tracks = vec![track("ja", false), track("fr", true)];
        assert!(select_track(&tracks, &langs()).is_none());
    }

    #[test]
    fn test_json3_url_replaces_format() {
        assert_eq!(
            json3_url("https://example.test/api/timedtext?v=abc&lang=ko&fmt=srv3"),
            "https://example.test/api/timedtext?v=abc&lang=ko&fmt=json3"
        );
    }

    #[test]
    fn test_transcript_text_in_timeline_order() {
        let json = r#"{
            "events": [
                {"tStartMs": 3000, "segs": [{"utf8": "then add "}, {"utf8": "garlic"}]},
                {"tStartMs": 0, "segs": [{"utf8": "first boil\nwater"}]},
                {"tStartMs": 1500},
                {"tStartMs": 2000, "segs": [{"utf8": "\n"}]}
            ]
        }"#;

        let transcript: Json3Transcript = serde_json::from_str(json).unwrap();
        assert_eq!(transcript_text(transcript), "first boil water then add garlic");
    }

    #[test]
    fn test_unplayable_video_is_unavailable() {
        let json = r#"{"playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}}"#;
        let response: PlayerResponse = serde_json::from_str(json).unwrap();

        let err = caption_tracks(response, "gone").unwrap_err();
        assert!(matches!(err, FetchError::TranscriptUnavailable(_)));
    }

    #[test]
    fn test_missing_caption_renderer_is_disabled() {
        let json = r#"{"playabilityStatus": {"status": "OK"}}"#;
        let response: PlayerResponse = serde_json::from_str(json).unwrap();

        let err = caption_tracks(response, "abc").unwrap_err();
        assert!(matches!(err, FetchError::TranscriptUnavailable(_)));
    }

    #[test]
    fn test_caption_tracks_parsed() {
        let json = r#"{
            "playabilityStatus": {"status": "OK"},
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [
                        {"baseUrl": "https://example.test/a", "languageCode": "ko", "kind": "asr"},
                        {"baseUrl": "https://example.test/b", "languageCode": "en"}
                    ]
                }
            }
        }"#;
        let response: PlayerResponse = serde_json::from_str(json).unwrap();

        let tracks = caption_tracks(response, "abc").unwrap();
        assert_eq!(tracks.len(), 2);
        assert!(tracks[0].is_generated());
        assert!(!tracks[1].is_generated());
    }
}
