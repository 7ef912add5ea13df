//! YouTube URL resolution.
//!
//! Every submitted URL is reduced to its canonical video ID so that all URL
//! forms of the same video share one global record.

/// Errors that can occur while resolving a video URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoUrlError {
    /// URL host is not a supported YouTube domain
    UnsupportedSource,
    /// Video ID has invalid format
    InvalidVideoId,
    /// No recognizable video ID in the URL
    VideoIdNotFound,
}

impl std::fmt::Display for VideoUrlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoUrlError::UnsupportedSource => write!(f, "URL is not a supported YouTube URL"),
            VideoUrlError::InvalidVideoId => write!(f, "Video ID has invalid format"),
            VideoUrlError::VideoIdNotFound => write!(f, "Video ID not found in URL"),
        }
    }
}

impl std::error::Error for VideoUrlError {}

/// Result type for URL resolution.
pub type VideoUrlResult<T> = Result<T, VideoUrlError>;

/// Resolve a YouTube URL to its canonical video ID.
///
/// Supports all common URL forms:
/// - https://youtube.com/watch?v=VIDEO_ID
/// - https://youtu.be/VIDEO_ID
/// - https://youtube.com/embed/VIDEO_ID
/// - https://youtube.com/v/VIDEO_ID
/// - https://youtube.com/shorts/VIDEO_ID
/// - With or without query parameters, fragments, etc.
pub fn resolve_video_id(url: &str) -> VideoUrlResult<crate::video::VideoId> {
    let url = url.trim();

    if !is_supported_host(url) {
        return Err(VideoUrlError::UnsupportedSource);
    }

    // Extraction strategies in order of preference
    if let Some(id) = extract_from_watch_url(url) {
        return validate_id(id);
    }

    if let Some(id) = extract_from_short_url(url) {
        return validate_id(id);
    }

    if let Some(id) = extract_from_embed_url(url) {
        return validate_id(id);
    }

    if let Some(id) = extract_from_v_url(url) {
        return validate_id(id);
    }

    if let Some(id) = extract_from_shorts_url(url) {
        return validate_id(id);
    }

    Err(VideoUrlError::VideoIdNotFound)
}

/// Check if the URL points at a supported YouTube host.
fn is_supported_host(url: &str) -> bool {
    let host = match url::Url::parse(url) {
        Ok(u) => match u.host_str() {
            Some(h) => h.to_ascii_lowercase(),
            None => return false,
        },
        // Bare "youtu.be/ID" style input without a scheme
        Err(_) => {
            let lower = url.to_ascii_lowercase();
            return lower.contains("youtube.com") || lower.contains("youtu.be");
        }
    };

    matches!(
        host.as_str(),
        "youtube.com" | "www.youtube.com" | "m.youtube.com" | "youtu.be"
    )
}

/// Extract ID from youtube.com/watch?v=VIDEO_ID
fn extract_from_watch_url(url: &str) -> Option<String> {
    if let Some(v_pos) = url.find("?v=") {
        extract_id_from_segment(&url[v_pos + 3..])
    } else if let Some(v_pos) = url.find("&v=") {
        extract_id_from_segment(&url[v_pos + 3..])
    } else {
        None
    }
}

/// Extract ID from youtu.be/VIDEO_ID
fn extract_from_short_url(url: &str) -> Option<String> {
    let be_pos = url.find("youtu.be/")?;
    let start = be_pos + 9;
    if start < url.len() {
        extract_id_from_segment(&url[start..])
    } else {
        None
    }
}

/// Extract ID from youtube.com/embed/VIDEO_ID
fn extract_from_embed_url(url: &str) -> Option<String> {
    let pos = url.find("/embed/")?;
    let start = pos + 7;
    if start < url.len() {
        extract_id_from_segment(&url[start..])
    } else {
        None
    }
}

/// Extract ID from youtube.com/v/VIDEO_ID
fn extract_from_v_url(url: &str) -> Option<String> {
    let pos = url.find("/v/")?;
    let start = pos + 3;
    if start < url.len() {
        extract_id_from_segment(&url[start..])
    } else {
        None
    }
}

/// Extract ID from youtube.com/shorts/VIDEO_ID
fn extract_from_shorts_url(url: &str) -> Option<String> {
    let pos = url.find("/shorts/")?;
    let start = pos + 8;
    if start < url.len() {
        extract_id_from_segment(&url[start..])
    } else {
        None
    }
}

/// Take the first segment up to a delimiter.
fn extract_id_from_segment(segment: &str) -> Option<String> {
    let delimiters = ['&', '#', '?', '/'];
    let end = segment
        .find(|c| delimiters.contains(&c))
        .unwrap_or(segment.len());
    Some(segment[..end].trim().to_string())
}

/// Validate the ID charset and wrap it.
///
/// Standard ids are 11 characters, but shorter and longer ids exist; only
/// the `[A-Za-z0-9_-]` charset is enforced.
fn validate_id(id: String) -> VideoUrlResult<crate::video::VideoId> {
    if id.is_empty() {
        return Err(VideoUrlError::InvalidVideoId);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(VideoUrlError::InvalidVideoId);
    }

    Ok(crate::video::VideoId(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_url_forms_resolve_to_same_id() {
        let forms = [
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/v/dQw4w9WgXcQ",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ&list=PLrAXtmRdnEQy4qtr",
            "https://youtu.be/dQw4w9WgXcQ?t=30",
            "https://youtube.com/watch?v=dQw4w9WgXcQ#t=1m",
        ];

        for form in forms {
            assert_eq!(
                resolve_video_id(form).unwrap().as_str(),
                "dQw4w9WgXcQ",
                "failed for {form}"
            );
        }
    }

    #[test]
    fn test_unsupported_hosts_rejected() {
        assert!(matches!(
            resolve_video_id("https://vimeo.com/123456"),
            Err(VideoUrlError::UnsupportedSource)
        ));

        assert!(matches!(
            resolve_video_id("https://example.com/watch?v=dQw4w9WgXcQ"),
            Err(VideoUrlError::UnsupportedSource)
        ));

        // Lookalike domain is not in the whitelist
        assert!(matches!(
            resolve_video_id("https://notyoutube.example/watch?v=dQw4w9WgXcQ"),
            Err(VideoUrlError::UnsupportedSource)
        ));
    }

    #[test]
    fn test_missing_or_invalid_ids_rejected() {
        assert!(matches!(
            resolve_video_id("https://youtube.com"),
            Err(VideoUrlError::VideoIdNotFound)
        ));

        assert!(matches!(
            resolve_video_id("https://youtu.be/"),
            Err(VideoUrlError::VideoIdNotFound)
        ));

        // invalid characters
        assert!(matches!(
            resolve_video_id("https://youtube.com/watch?v=abc123def!!"),
            Err(VideoUrlError::InvalidVideoId)
        ));

        // empty ID
        assert!(matches!(
            resolve_video_id("https://youtube.com/watch?v="),
            Err(VideoUrlError::InvalidVideoId)
        ));
    }

    #[test]
    fn test_short_ids_resolve() {
        let forms = [
            "https://youtube.com/watch?v=abc123",
            "https://youtu.be/abc123",
            "https://youtube.com/embed/abc123",
        ];

        for form in forms {
            assert_eq!(
                resolve_video_id(form).unwrap().as_str(),
                "abc123",
                "failed for {form}"
            );
        }

        // Longer-than-standard ids pass the charset check too
        assert_eq!(
            resolve_video_id("https://youtu.be/abc123def456789")
                .unwrap()
                .as_str(),
            "abc123def456789"
        );
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(
            resolve_video_id("  https://youtube.com/watch?v=dQw4w9WgXcQ  ")
                .unwrap()
                .as_str(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_ids_with_underscore_and_hyphen() {
        assert_eq!(
            resolve_video_id("https://youtu.be/a_b-C_d-E_f").unwrap().as_str(),
            "a_b-C_d-E_f"
        );
    }
}
