//! Transcript fetching with a proxy-fallback strategy chain.
//!
//! Sources are tried in order: premium proxy tier, rotating free-proxy pool,
//! then a direct connection. Each source gets a bounded number of attempts
//! with a linearly increasing delay; the first non-empty transcript wins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use serde::Deserialize;
use tracing::{debug, info, warn};

use vlearn_models::VideoId;

use crate::error::{IngestError, IngestResult};

/// A single way of obtaining a transcript.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Short name for logs and error messages.
    fn name(&self) -> &str;

    /// Fetch the full transcript text.
    async fn fetch(&self, video_id: &VideoId) -> IngestResult<String>;
}

/// Ordered chain of transcript sources with per-source retries.
pub struct TranscriptFetcher {
    sources: Vec<Box<dyn TranscriptSource>>,
    retries_per_source: u32,
    base_delay: Duration,
}

impl TranscriptFetcher {
    pub const DEFAULT_RETRIES_PER_SOURCE: u32 = 2;
    const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

    pub fn new(sources: Vec<Box<dyn TranscriptSource>>) -> Self {
        Self {
            sources,
            retries_per_source: Self::DEFAULT_RETRIES_PER_SOURCE,
            base_delay: Self::DEFAULT_BASE_DELAY,
        }
    }

    pub fn with_retries(mut self, retries_per_source: u32) -> Self {
        self.retries_per_source = retries_per_source.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Build the production chain from environment configuration.
    ///
    /// - `TRANSCRIPT_PREMIUM_PROXY` — single premium proxy URL
    /// - `TRANSCRIPT_PROXY_POOL` — comma-separated rotating proxy URLs
    ///
    /// A direct-connection source is always appended last.
    pub fn from_env() -> IngestResult<Self> {
        let mut sources: Vec<Box<dyn TranscriptSource>> = Vec::new();

        if let Ok(premium) = std::env::var("TRANSCRIPT_PREMIUM_PROXY") {
            if !premium.trim().is_empty() {
                sources.push(Box::new(TimedTextSource::via_proxy(
                    "premium-proxy",
                    premium.trim(),
                )?));
            }
        }

        if let Ok(pool) = std::env::var("TRANSCRIPT_PROXY_POOL") {
            let proxies: Vec<String> = pool
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !proxies.is_empty() {
                sources.push(Box::new(RotatingProxySource::new(proxies)?));
            }
        }

        sources.push(Box::new(TimedTextSource::direct()?));

        Ok(Self::new(sources))
    }

    /// Fetch a transcript, walking the chain until a source succeeds.
    ///
    /// Exhaustion yields a single terminal error naming the last cause; the
    /// total number of attempts is sources x retries_per_source.
    pub async fn fetch(&self, video_id: &VideoId) -> IngestResult<String> {
        let mut last_cause = "no transcript sources configured".to_string();

        for source in &self.sources {
            for attempt in 1..=self.retries_per_source {
                debug!(
                    video_id = %video_id,
                    source = source.name(),
                    attempt,
                    "Fetching transcript"
                );

                match source.fetch(video_id).await {
                    Ok(text) if !text.trim().is_empty() => {
                        info!(
                            video_id = %video_id,
                            source = source.name(),
                            chars = text.len(),
                            "Transcript fetched"
                        );
                        return Ok(text);
                    }
                    Ok(_) => {
                        last_cause = format!("{}: empty transcript", source.name());
                        warn!(video_id = %video_id, source = source.name(), "Empty transcript");
                    }
                    Err(e) => {
                        last_cause = format!("{}: {}", source.name(), e);
                        warn!(
                            video_id = %video_id,
                            source = source.name(),
                            attempt,
                            "Transcript fetch failed: {}",
                            e
                        );
                    }
                }

                if attempt < self.retries_per_source {
                    tokio::time::sleep(self.base_delay * attempt).await;
                }
            }
        }

        metrics::counter!("transcript_exhausted_total").increment(1);
        Err(IngestError::transcript(format!(
            "All transcript sources exhausted for {} (last cause: {})",
            video_id.as_str(),
            last_cause
        )))
    }
}

// =============================================================================
// Timedtext HTTP source
// =============================================================================

/// Caption track languages tried in order.
const CAPTION_LANGUAGES: [&str; 3] = ["en", "en-US", "en-GB"];

/// Fetches captions from YouTube's timedtext endpoint (json3 format).
pub struct TimedTextSource {
    name: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct TimedTextResponse {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(default)]
    segs: Vec<TimedTextSegment>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSegment {
    #[serde(default)]
    utf8: String,
}

impl TimedTextSource {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

    /// Direct connection, no proxy.
    pub fn direct() -> IngestResult<Self> {
        let http = Self::builder().build()?;
        Ok(Self {
            name: "direct".to_string(),
            http,
        })
    }

    /// Route all requests through one proxy.
    pub fn via_proxy(name: impl Into<String>, proxy_url: &str) -> IngestResult<Self> {
        let proxy = Proxy::all(proxy_url)
            .map_err(|e| IngestError::Config(format!("Invalid proxy URL: {}", e)))?;
        let http = Self::builder().proxy(proxy).build()?;
        Ok(Self {
            name: name.into(),
            http,
        })
    }

    fn builder() -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("vlearn-ingest/", env!("CARGO_PKG_VERSION")))
    }

    async fn fetch_language(&self, video_id: &VideoId, lang: &str) -> IngestResult<String> {
        let url = format!(
            "https://www.youtube.com/api/timedtext?v={}&lang={}&fmt=json3",
            video_id.as_str(),
            lang
        );

        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(IngestError::transcript(format!(
                "timedtext returned {} for lang {}",
                response.status(),
                lang
            )));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            // No caption track for this language
            return Ok(String::new());
        }

        let parsed: TimedTextResponse = serde_json::from_str(&body)
            .map_err(|e| IngestError::transcript(format!("timedtext parse error: {}", e)))?;

        let text = parsed
            .events
            .iter()
            .flat_map(|e| e.segs.iter())
            .map(|s| s.utf8.as_str())
            .collect::<Vec<_>>()
            .join("")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        Ok(text)
    }
}

#[async_trait]
impl TranscriptSource for TimedTextSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, video_id: &VideoId) -> IngestResult<String> {
        let mut last_error = None;

        for lang in CAPTION_LANGUAGES {
            match self.fetch_language(video_id, lang).await {
                Ok(text) if !text.is_empty() => return Ok(text),
                Ok(_) => continue,
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| IngestError::transcript("No caption track in any language")))
    }
}

// =============================================================================
// Rotating proxy pool
// =============================================================================

/// Round-robins each attempt across a pool of proxies.
pub struct RotatingProxySource {
    sources: Vec<TimedTextSource>,
    next: AtomicUsize,
}

impl RotatingProxySource {
    pub fn new(proxy_urls: Vec<String>) -> IngestResult<Self> {
        if proxy_urls.is_empty() {
            return Err(IngestError::Config("Empty proxy pool".to_string()));
        }

        let mut sources = Vec::with_capacity(proxy_urls.len());
        for (i, url) in proxy_urls.iter().enumerate() {
            sources.push(TimedTextSource::via_proxy(format!("pool-{}", i), url)?);
        }

        Ok(Self {
            sources,
            next: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TranscriptSource for RotatingProxySource {
    fn name(&self) -> &str {
        "proxy-pool"
    }

    async fn fetch(&self, video_id: &VideoId) -> IngestResult<String> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.sources.len();
        self.sources[index].fetch(video_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    struct FailingSource {
        name: &'static str,
        calls: Arc<AtomicU32>,
    }

    impl FailingSource {
        fn new(name: &'static str) -> (Box<Self>, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Box::new(Self {
                    name,
                    calls: calls.clone(),
                }),
                calls,
            )
        }
    }

    #[async_trait]
    impl TranscriptSource for FailingSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _video_id: &VideoId) -> IngestResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(IngestError::transcript("blocked"))
        }
    }

    struct FixedSource {
        text: &'static str,
    }

    #[async_trait]
    impl TranscriptSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self, _video_id: &VideoId) -> IngestResult<String> {
            Ok(self.text.to_string())
        }
    }

    #[tokio::test]
    async fn test_chain_exhaustion_names_last_source() {
        let (first, _) = FailingSource::new("first");
        let (second, _) = FailingSource::new("second");
        let (third, _) = FailingSource::new("third");

        let fetcher = TranscriptFetcher::new(vec![first, second, third])
            .with_retries(3)
            .with_base_delay(Duration::from_millis(1));

        let err = fetcher.fetch(&"dQw4w9WgXcQ".into()).await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("third"), "unexpected error: {msg}");
        assert!(matches!(err, IngestError::TranscriptUnavailable(_)));
    }

    #[tokio::test]
    async fn test_exact_attempt_count() {
        let (first, calls) = FailingSource::new("first");

        let fetcher = TranscriptFetcher::new(vec![first])
            .with_retries(4)
            .with_base_delay(Duration::from_millis(1));

        let _ = fetcher.fetch(&"dQw4w9WgXcQ".into()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_empty_transcript_falls_through() {
        let fetcher = TranscriptFetcher::new(vec![
            Box::new(FixedSource { text: "   " }),
            Box::new(FixedSource { text: "real words" }),
        ])
        .with_retries(1);

        let text = fetcher.fetch(&"dQw4w9WgXcQ".into()).await.unwrap();
        assert_eq!(text, "real words");
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let (blocked, calls) = FailingSource::new("blocked");

        let fetcher = TranscriptFetcher::new(vec![
            Box::new(FixedSource { text: "hello" }),
            blocked,
        ])
        .with_retries(3);

        let text = fetcher.fetch(&"dQw4w9WgXcQ".into()).await.unwrap();
        assert_eq!(text, "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_timedtext_json3_parsing() {
        let body = r#"{"events":[{"segs":[{"utf8":"hello "},{"utf8":"world"}]},{"segs":[{"utf8":" again"}]}]}"#;
        let parsed: TimedTextResponse = serde_json::from_str(body).unwrap();
        let text = parsed
            .events
            .iter()
            .flat_map(|e| e.segs.iter())
            .map(|s| s.utf8.as_str())
            .collect::<Vec<_>>()
            .join("")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(text, "hello world again");
    }
}
