//! Video metadata and learning-content models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical YouTube video identifier (usually 11 characters).
///
/// Always produced by [`crate::url::resolve_video_id`]; two URLs pointing at
/// the same video resolve to the same `VideoId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Descriptive metadata fetched from the YouTube Data API.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoInfo {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,

    /// Human-readable duration, e.g. "1h 2m 3s".
    pub duration: String,

    pub thumbnail_url: String,
    pub publish_date: String,

    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,

    /// Canonical watch URL.
    pub video_url: String,
}

/// Generated learning-content bundle for a video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoContent {
    /// Full transcript text the bundle was generated from.
    pub transcript: String,

    pub summary: String,

    /// Up to seven main points.
    pub main_points: Vec<String>,

    #[serde(default)]
    pub key_concepts: Vec<String>,

    pub study_guide: String,

    pub analysis: String,

    #[serde(default)]
    pub vocabulary: Vec<String>,
}

/// Global per-video record, shared by all users.
///
/// Keyed by the canonical [`VideoId`]; user-specific state never lives here.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GlobalVideo {
    pub video_id: VideoId,
    pub info: VideoInfo,
    pub content: VideoContent,

    /// When this record was first created.
    pub processed_at: DateTime<Utc>,

    /// Last time any user requested this video.
    pub last_accessed: DateTime<Utc>,

    /// Number of times any user has requested this video.
    #[serde(default)]
    pub processed_count: u64,
}

impl GlobalVideo {
    pub fn new(video_id: VideoId, info: VideoInfo, content: VideoContent) -> Self {
        let now = Utc::now();
        Self {
            video_id,
            info,
            content,
            processed_at: now,
            last_accessed: now,
            processed_count: 1,
        }
    }
}

/// Per-user reference to a global video record.
///
/// Keyed by `(user_id, video_id)`; holds only user-specific state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserVideoEntry {
    pub video_id: VideoId,

    /// Watch progress in `[0.0, 1.0]`.
    #[serde(default)]
    pub progress: f64,

    #[serde(default)]
    pub is_favorite: bool,

    #[serde(default)]
    pub notes: String,

    pub added_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_watched: Option<DateTime<Utc>>,

    /// Chat history for this user and video, in insertion order.
    #[serde(default)]
    pub chat_history: Vec<crate::chat::ChatMessage>,
}

impl UserVideoEntry {
    /// Fresh entry with zero progress and empty notes.
    pub fn new(video_id: VideoId) -> Self {
        Self {
            video_id,
            progress: 0.0,
            is_favorite: false,
            notes: String::new(),
            added_at: Utc::now(),
            last_watched: None,
            chat_history: Vec::new(),
        }
    }
}

/// Combined view returned to the client: global record joined with the
/// caller's own entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoResponse {
    pub video_id: VideoId,
    pub info: VideoInfo,
    pub content: VideoContent,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_watched: Option<DateTime<Utc>>,
}

impl VideoResponse {
    pub fn from_parts(global: GlobalVideo, entry: UserVideoEntry) -> Self {
        Self {
            video_id: global.video_id,
            info: global.info,
            content: global.content,
            progress: entry.progress,
            is_favorite: entry.is_favorite,
            notes: entry.notes,
            created_at: entry.added_at,
            last_watched: entry.last_watched,
        }
    }
}

/// Summary of a video in the user's library (for list views).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoLibraryItem {
    pub video_id: VideoId,
    pub title: String,
    pub author: String,
    pub duration: String,
    pub thumbnail_url: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub is_favorite: bool,
    pub added_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_watched: Option<DateTime<Utc>>,
}

impl VideoLibraryItem {
    /// Join a library entry with its global record.
    pub fn from_parts(global: &GlobalVideo, entry: &UserVideoEntry) -> Self {
        Self {
            video_id: entry.video_id.clone(),
            title: global.info.title.clone(),
            author: global.info.author.clone(),
            duration: global.info.duration.clone(),
            thumbnail_url: global.info.thumbnail_url.clone(),
            progress: entry.progress,
            is_favorite: entry.is_favorite,
            added_at: entry.added_at,
            last_watched: entry.last_watched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> VideoInfo {
        VideoInfo {
            title: "Intro to Graphs".to_string(),
            author: "CS Channel".to_string(),
            description: "Graph basics".to_string(),
            duration: "12m 4s".to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
            publish_date: "2024-01-15T00:00:00Z".to_string(),
            views: 1000,
            likes: 50,
            video_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        }
    }

    fn sample_content() -> VideoContent {
        VideoContent {
            transcript: "hello world".to_string(),
            summary: "a summary".to_string(),
            main_points: vec!["p1".to_string()],
            key_concepts: vec![],
            study_guide: "guide".to_string(),
            analysis: "analysis".to_string(),
            vocabulary: vec![],
        }
    }

    #[test]
    fn test_global_video_new_counts_first_access() {
        let g = GlobalVideo::new("dQw4w9WgXcQ".into(), sample_info(), sample_content());
        assert_eq!(g.processed_count, 1);
        assert_eq!(g.processed_at, g.last_accessed);
    }

    #[test]
    fn test_response_join_prefers_entry_state() {
        let g = GlobalVideo::new("dQw4w9WgXcQ".into(), sample_info(), sample_content());
        let mut e = UserVideoEntry::new("dQw4w9WgXcQ".into());
        e.progress = 0.5;
        e.is_favorite = true;
        e.notes = "mine".to_string();

        let resp = VideoResponse::from_parts(g, e);
        assert_eq!(resp.progress, 0.5);
        assert!(resp.is_favorite);
        assert_eq!(resp.notes, "mine");
        assert_eq!(resp.info.title, "Intro to Graphs");
    }

    #[test]
    fn test_entry_roundtrips_with_missing_optional_fields() {
        let json = r#"{"video_id":"dQw4w9WgXcQ","added_at":"2024-01-15T00:00:00Z"}"#;
        let e: UserVideoEntry = serde_json::from_str(json).unwrap();
        assert_eq!(e.progress, 0.0);
        assert!(!e.is_favorite);
        assert!(e.chat_history.is_empty());
        assert!(e.last_watched.is_none());
    }
}
