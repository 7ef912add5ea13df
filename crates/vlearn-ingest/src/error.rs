//! Ingestion error types.

use thiserror::Error;

use vlearn_models::VideoUrlError;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while ingesting a video.
///
/// Each variant maps to one pipeline step so the API layer can name the step
/// that failed.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid video URL: {0}")]
    InvalidUrl(#[from] VideoUrlError),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Metadata fetch failed: {0}")]
    MetadataUnavailable(String),

    #[error("Transcript unavailable: {0}")]
    TranscriptUnavailable(String),

    #[error("Content synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Quiz response could not be parsed: {0}")]
    QuizParse(String),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] vlearn_firestore::FirestoreError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl IngestError {
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::MetadataUnavailable(msg.into())
    }

    pub fn transcript(msg: impl Into<String>) -> Self {
        Self::TranscriptUnavailable(msg.into())
    }

    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::SynthesisFailed(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Pipeline step this error belongs to, for logs and error responses.
    pub fn step(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "resolve",
            Self::VideoNotFound(_) | Self::MetadataUnavailable(_) => "metadata",
            Self::TranscriptUnavailable(_) => "transcript",
            Self::SynthesisFailed(_) | Self::QuizParse(_) | Self::Generation(_) => "synthesis",
            Self::Config(_) => "config",
            Self::Store(_) => "store",
            Self::Network(_) => "network",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names() {
        assert_eq!(IngestError::metadata("x").step(), "metadata");
        assert_eq!(IngestError::transcript("x").step(), "transcript");
        assert_eq!(IngestError::synthesis("x").step(), "synthesis");
        assert_eq!(
            IngestError::InvalidUrl(VideoUrlError::UnsupportedSource).step(),
            "resolve"
        );
    }
}
