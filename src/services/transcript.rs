use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::CaptionFragment;

const WATCH_URL: &str = "https://www.youtube.com/watch";
const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const THUMBNAIL_BASE_URL: &str = "http://img.youtube.com/vi";
const VIDEO_ID_MARKER: &str = "v=";
const USER_AGENT_STRING: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

// The player endpoint only hands out caption URLs without a proof-of-origin
// token to mobile clients.
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

// Wide enough that html2text never wraps a caption cue.
const DECODE_WIDTH: usize = 10_000;

/// Source of caption tracks for a video.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Caption cues in original order.
    async fn fetch_captions(&self, video_id: &str) -> Result<Vec<CaptionFragment>>;
}

/// Extract the video identifier that follows the `v=` marker in a link.
pub fn extract_video_id(link: &str) -> Result<String> {
    let link = link.trim();

    let id = match Url::parse(link) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| AppError::InvalidLink(format!("no '{VIDEO_ID_MARKER}' in {link:?}")))?,
        // No scheme: split on the marker directly
        Err(_) => {
            let (_, rest) = link
                .split_once(VIDEO_ID_MARKER)
                .ok_or_else(|| AppError::InvalidLink(format!("no '{VIDEO_ID_MARKER}' in {link:?}")))?;
            rest.split(['&', '#']).next().unwrap_or_default().to_string()
        }
    };

    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(AppError::InvalidLink(format!("empty video id in {link:?}")));
    }
    Ok(id)
}

pub fn thumbnail_url(video_id: &str) -> String {
    format!("{THUMBNAIL_BASE_URL}/{video_id}/0.jpg")
}

/// Concatenate cues in order, separated by single spaces.
pub fn join_fragments(fragments: &[CaptionFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    tracklist: Option<CaptionTracklist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTracklist {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

pub struct YoutubeTranscriptFetcher {
    client: Client,
    languages: Vec<String>,
}

impl YoutubeTranscriptFetcher {
    pub fn new(languages: Vec<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(Self { client, languages })
    }

    async fn fetch_innertube_key(&self, video_id: &str) -> Result<String> {
        let response = self
            .client
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Transcript(format!(
                "watch page for {video_id} returned HTTP {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        extract_innertube_key(&html).ok_or_else(|| {
            if html.contains("action=\"https://consent.youtube.com/s\"") {
                AppError::Transcript("cookie consent required before captions can be read".to_string())
            } else if html.contains("class=\"g-recaptcha\"") {
                AppError::Transcript("too many requests, captcha presented".to_string())
            } else {
                AppError::Transcript(format!("player configuration not found for {video_id}"))
            }
        })
    }

    async fn fetch_caption_tracks(&self, video_id: &str, api_key: &str) -> Result<Vec<CaptionTrack>> {
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .client
            .post(INNERTUBE_PLAYER_URL)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::Transcript(format!("player API error: {error_text}")));
        }

        let player: PlayerResponse = response.json().await?;
        caption_tracks(video_id, player)
    }
}

#[async_trait]
impl TranscriptProvider for YoutubeTranscriptFetcher {
    async fn fetch_captions(&self, video_id: &str) -> Result<Vec<CaptionFragment>> {
        let api_key = self.fetch_innertube_key(video_id).await?;
        let tracks = self.fetch_caption_tracks(video_id, &api_key).await?;

        let track = select_track(&tracks, &self.languages).ok_or_else(|| {
            let available: Vec<&str> = tracks.iter().map(|t| t.language_code.as_str()).collect();
            AppError::Transcript(format!(
                "no captions in {:?} for {video_id} (available: {})",
                self.languages,
                available.join(", ")
            ))
        })?;

        tracing::debug!(
            "Using {} captions ({}) for {}",
            track.language_code,
            if track.is_generated() { "generated" } else { "manual" },
            video_id
        );

        let url = track.base_url.replace("&fmt=srv3", "");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Transcript(format!(
                "caption track returned HTTP {}",
                response.status()
            )));
        }

        let xml = response.text().await?;
        let fragments = parse_timedtext(&xml);
        if fragments.is_empty() {
            return Err(AppError::Transcript(format!("caption track for {video_id} is empty")));
        }
        Ok(fragments)
    }
}

fn extract_innertube_key(html: &str) -> Option<String> {
    static KEY_RE: OnceLock<Regex> = OnceLock::new();
    let re = KEY_RE.get_or_init(|| {
        Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid regex")
    });
    re.captures(html).map(|caps| caps[1].to_string())
}

fn caption_tracks(video_id: &str, player: PlayerResponse) -> Result<Vec<CaptionTrack>> {
    if let Some(status) = &player.playability_status {
        if status.status != "OK" {
            let reason = status.reason.as_deref().unwrap_or("no reason given");
            return Err(AppError::Transcript(format!(
                "video {video_id} is unavailable ({}): {reason}",
                status.status
            )));
        }
    }

    let tracks = player
        .captions
        .and_then(|c| c.tracklist)
        .map(|t| t.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(AppError::Transcript(format!("captions are disabled for {video_id}")));
    }
    Ok(tracks)
}

/// For each language in order, a manually created track beats a generated one.
fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|lang| {
        let mut candidates = tracks.iter().filter(|t| &t.language_code == lang);
        let manual = candidates.clone().find(|t| !t.is_generated());
        manual.or_else(|| candidates.next())
    })
}

fn parse_timedtext(xml: &str) -> Vec<CaptionFragment> {
    static CUE_RE: OnceLock<Regex> = OnceLock::new();
    static ATTR_RE: OnceLock<Regex> = OnceLock::new();
    let cue_re = CUE_RE.get_or_init(|| {
        Regex::new(r#"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)"#).expect("valid regex")
    });
    let attr_re = ATTR_RE.get_or_init(|| {
        Regex::new(r#"(start|dur)="([^"]*)""#).expect("valid regex")
    });

    cue_re
        .captures_iter(xml)
        .filter_map(|caps| {
            let text = decode_caption(caps.get(2).map_or("", |m| m.as_str()));
            if text.is_empty() {
                return None;
            }

            let mut start = 0.0;
            let mut duration = 0.0;
            for attr in attr_re.captures_iter(&caps[1]) {
                let value = attr[2].parse::<f64>().unwrap_or_default();
                match &attr[1] {
                    "start" => start = value,
                    _ => duration = value,
                }
            }

            Some(CaptionFragment { text, start, duration })
        })
        .collect()
}

// Cue bodies arrive entity-encoded twice (XML escaping on top of HTML
// escaping), so decode twice and flatten line breaks.
fn decode_caption(raw: &str) -> String {
    let once = decode_html(raw);
    decode_html(&once)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_html(raw: &str) -> String {
    match html2text::from_read(raw.as_bytes(), DECODE_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("Failed to decode caption text: {}", e);
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(lang: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://www.youtube.com/api/timedtext?lang={lang}"),
            language_code: lang.to_string(),
            kind: kind.map(|k| k.to_string()),
        }
    }

    #[test]
    fn test_extract_video_id_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("  https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=120s ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=abc123").unwrap(),
            "abc123"
        );
    }

    #[test]
    fn test_extract_video_id_without_scheme() {
        assert_eq!(extract_video_id("youtube.com/watch?v=abc123#top").unwrap(), "abc123");
    }

    #[test]
    fn test_extract_video_id_rejects_missing_marker() {
        assert!(matches!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Err(AppError::InvalidLink(_))
        ));
        assert!(matches!(extract_video_id(""), Err(AppError::InvalidLink(_))));
        assert!(matches!(
            extract_video_id("https://www.youtube.com/watch?v="),
            Err(AppError::InvalidLink(_))
        ));
    }

    #[test]
    fn test_thumbnail_url() {
        assert_eq!(
            thumbnail_url("dQw4w9WgXcQ"),
            "http://img.youtube.com/vi/dQw4w9WgXcQ/0.jpg"
        );
    }

    #[test]
    fn test_join_fragments_keeps_order() {
        let fragments: Vec<CaptionFragment> = ["welcome back", "to the show", "today"]
            .iter()
            .enumerate()
            .map(|(i, text)| CaptionFragment {
                text: text.to_string(),
                start: i as f64,
                duration: 1.0,
            })
            .collect();

        assert_eq!(join_fragments(&fragments), "welcome back to the show today");
        assert_eq!(join_fragments(&[]), "");
    }

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
<text start="0.16" dur="2.4">Hey there</text>
<text start="2.56" dur="1.2"></text>
<text start="3.1" dur="0.5"/>
<text start="3.76" dur="3.1">I&amp;#39;m talking
about Rust</text>
</transcript>"#;

        let fragments = parse_timedtext(xml);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "Hey there");
        assert!((fragments[0].start - 0.16).abs() < f64::EPSILON);
        assert!((fragments[0].duration - 2.4).abs() < f64::EPSILON);
        assert_eq!(fragments[1].text, "I'm talking about Rust");
    }

    #[test]
    fn test_select_track_prefers_manual_then_language_order() {
        let tracks = vec![
            track("de", None),
            track("en", Some("asr")),
            track("en", None),
        ];
        let languages = vec!["en".to_string(), "de".to_string()];

        let chosen = select_track(&tracks, &languages).unwrap();
        assert_eq!(chosen.language_code, "en");
        assert!(!chosen.is_generated());

        let generated_only = vec![track("en", Some("asr"))];
        assert!(select_track(&generated_only, &languages).unwrap().is_generated());

        let french = vec![track("fr", None)];
        assert!(select_track(&french, &languages).is_none());
    }

    #[test]
    fn test_caption_tracks_from_player_response() {
        let player: PlayerResponse = serde_json::from_str(
            r#"{
                "playabilityStatus": {"status": "OK"},
                "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                    {"baseUrl": "https://www.youtube.com/api/timedtext?v=x&fmt=srv3", "languageCode": "en", "kind": "asr"}
                ]}}
            }"#,
        )
        .unwrap();

        let tracks = caption_tracks("x", player).unwrap();
        assert_eq!(tracks.len(), 1);
        assert!(tracks[0].is_generated());
    }

    #[test]
    fn test_caption_tracks_errors() {
        let no_captions: PlayerResponse =
            serde_json::from_str(r#"{"playabilityStatus": {"status": "OK"}}"#).unwrap();
        assert!(matches!(
            caption_tracks("x", no_captions),
            Err(AppError::Transcript(msg)) if msg.contains("disabled")
        ));

        let unplayable: PlayerResponse = serde_json::from_str(
            r#"{"playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}}"#,
        )
        .unwrap();
        assert!(matches!(
            caption_tracks("x", unplayable),
            Err(AppError::Transcript(msg)) if msg.contains("Video unavailable")
        ));
    }

    #[test]
    fn test_extract_innertube_key() {
        let html = r#"<script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaSyA-test_key1","OTHER":1});</script>"#;
        assert_eq!(extract_innertube_key(html).as_deref(), Some("AIzaSyA-test_key1"));
        assert!(extract_innertube_key("<html></html>").is_none());
    }
}
