//! YouTube Data API metadata client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use vlearn_models::{VideoId, VideoInfo};

use crate::error::{IngestError, IngestResult};

/// Client for the YouTube Data API v3 `videos` endpoint.
pub struct MetadataClient {
    http: Client,
    api_key: String,
}

// YouTube Data API response shapes (only the fields we read).

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(rename = "channelTitle")]
    channel_title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: String,
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

#[derive(Debug, Default, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
}

impl MetadataClient {
    const MAX_RETRIES: u32 = 3;
    const RETRY_DELAY: Duration = Duration::from_secs(2);
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a client from the `YOUTUBE_API_KEY` environment variable.
    pub fn from_env() -> IngestResult<Self> {
        let api_key = std::env::var("YOUTUBE_API_KEY")
            .map_err(|_| IngestError::Config("YOUTUBE_API_KEY not set".to_string()))?;
        Self::new(api_key)
    }

    pub fn new(api_key: impl Into<String>) -> IngestResult<Self> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("vlearn-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
        })
    }

    /// Fetch metadata for a video.
    ///
    /// Transient failures are retried with a linearly increasing delay. An
    /// empty `items` array means the video does not exist (or is private)
    /// and is not retried.
    pub async fn fetch(&self, video_id: &VideoId) -> IngestResult<VideoInfo> {
        let mut last_error: Option<IngestError> = None;

        for attempt in 0..=Self::MAX_RETRIES {
            if attempt > 0 {
                let delay = Self::RETRY_DELAY * attempt;
                debug!(
                    video_id = %video_id,
                    attempt,
                    delay_secs = delay.as_secs(),
                    "Retrying metadata fetch"
                );
                tokio::time::sleep(delay).await;
            }

            match self.fetch_once(video_id).await {
                Ok(info) => return Ok(info),
                Err(e @ IngestError::VideoNotFound(_)) => return Err(e),
                Err(e) => {
                    warn!(video_id = %video_id, attempt, "Metadata fetch failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| IngestError::metadata("Metadata fetch failed with no attempts")))
    }

    async fn fetch_once(&self, video_id: &VideoId) -> IngestResult<VideoInfo> {
        let url = format!(
            "https://www.googleapis.com/youtube/v3/videos?id={}&key={}&part=snippet,contentDetails,statistics",
            video_id.as_str(),
            self.api_key
        );

        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(IngestError::metadata(format!(
                "YouTube API returned {}: {}",
                status, snippet
            )));
        }

        let data: VideosResponse = response.json().await?;

        let item = data.items.into_iter().next().ok_or_else(|| {
            IngestError::VideoNotFound(format!("Video {} not found", video_id.as_str()))
        })?;

        let thumbnail_url = item
            .snippet
            .thumbnails
            .high
            .or(item.snippet.thumbnails.medium)
            .or(item.snippet.thumbnails.default)
            .map(|t| t.url)
            .unwrap_or_default();

        Ok(VideoInfo {
            title: item.snippet.title,
            author: item.snippet.channel_title,
            description: item.snippet.description,
            duration: format_duration(&item.content_details.duration),
            thumbnail_url,
            publish_date: item.snippet.published_at,
            views: parse_count(item.statistics.view_count.as_deref()),
            likes: parse_count(item.statistics.like_count.as_deref()),
            video_url: format!("https://www.youtube.com/watch?v={}", video_id.as_str()),
        })
    }
}

fn parse_count(value: Option<&str>) -> u64 {
    value.and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Format an ISO 8601 duration (`PT#H#M#S`) as a readable string like
/// "1h 2m 3s". Unparseable input is returned unchanged.
pub fn format_duration(duration: &str) -> String {
    let Some(rest) = duration.strip_prefix("PT") else {
        return duration.to_string();
    };

    let mut parts: Vec<String> = Vec::new();
    let mut digits = String::new();

    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c {
            'H' => "h",
            'M' => "m",
            'S' => "s",
            _ => return duration.to_string(),
        };
        if digits.is_empty() {
            return duration.to_string();
        }
        parts.push(format!("{}{}", digits, unit));
        digits.clear();
    }

    if parts.is_empty() || !digits.is_empty() {
        return duration.to_string();
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_full() {
        assert_eq!(format_duration("PT1H2M3S"), "1h 2m 3s");
    }

    #[test]
    fn test_format_duration_partial() {
        assert_eq!(format_duration("PT15M33S"), "15m 33s");
        assert_eq!(format_duration("PT45S"), "45s");
        assert_eq!(format_duration("PT2H"), "2h");
    }

    #[test]
    fn test_format_duration_unparseable_passthrough() {
        assert_eq!(format_duration("P1DT2H"), "P1DT2H");
        assert_eq!(format_duration("garbage"), "garbage");
        assert_eq!(format_duration("PT"), "PT");
    }

    #[test]
    fn test_parse_count_defaults_to_zero() {
        assert_eq!(parse_count(Some("1234")), 1234);
        assert_eq!(parse_count(Some("not-a-number")), 0);
        assert_eq!(parse_count(None), 0);
    }
}
