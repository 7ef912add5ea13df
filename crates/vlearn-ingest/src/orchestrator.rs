//! Cache-first ingestion flow and user-facing composition.
//!
//! The orchestrator owns the pipeline clients and the global video cache.
//! Per-user repositories are constructed per call, scoped to the caller.

use std::sync::Arc;

use tracing::{info, warn};

use vlearn_firestore::{
    FirestoreClient, QuizAttemptsRepository, UserLibraryRepository, VideoCacheRepository,
    QUIZ_MAX_AGE_HOURS,
};
use vlearn_models::{
    resolve_video_id, ChatMessage, Quiz, VideoId, VideoLibraryItem, VideoResponse,
};

use crate::chat::ChatAssistant;
use crate::error::{IngestError, IngestResult};
use crate::gemini::TextGenerator;
use crate::metadata::MetadataClient;
use crate::quiz::QuizGenerator;
use crate::synthesizer::ContentSynthesizer;
use crate::transcript::TranscriptFetcher;

/// Global records are batch-fetched in chunks of this size.
const LIBRARY_BATCH_CHUNK: usize = 10;

/// Drives ingestion and the video-centric user flows.
pub struct IngestionOrchestrator {
    client: FirestoreClient,
    cache: VideoCacheRepository,
    metadata: MetadataClient,
    transcripts: TranscriptFetcher,
    generator: Arc<dyn TextGenerator>,
}

impl IngestionOrchestrator {
    pub fn new(
        client: FirestoreClient,
        metadata: MetadataClient,
        transcripts: TranscriptFetcher,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let cache = VideoCacheRepository::new(client.clone());
        Self {
            client,
            cache,
            metadata,
            transcripts,
            generator,
        }
    }

    fn library_for(&self, user_id: &str) -> UserLibraryRepository {
        UserLibraryRepository::new(self.client.clone(), user_id)
    }

    fn attempts_for(&self, user_id: &str) -> QuizAttemptsRepository {
        QuizAttemptsRepository::new(self.client.clone(), user_id)
    }

    /// Process a video URL for a user.
    ///
    /// Cache hits skip the pipeline entirely: the access counter is bumped
    /// best-effort and the user's entry is created if missing. Cache misses
    /// run the full metadata/transcript/synthesis pipeline and store the
    /// result globally before linking it into the user's library.
    pub async fn process_video(&self, user_id: &str, url: &str) -> IngestResult<VideoResponse> {
        let video_id = resolve_video_id(url)?;
        let library = self.library_for(user_id);

        if let Some(global) = self.cache.get(&video_id).await? {
            metrics::counter!("ingest_cache_hits_total").increment(1);
            info!(video_id = %video_id, "Serving video from global cache");

            // Counter bump must not fail the request
            if let Err(e) = self.cache.touch(&video_id).await {
                warn!(video_id = %video_id, "Failed to bump access counter: {}", e);
            }

            let entry = library.add_entry(&video_id).await?;
            return Ok(VideoResponse::from_parts(global, entry));
        }

        metrics::counter!("ingest_cache_misses_total").increment(1);
        info!(video_id = %video_id, "Cache miss, running ingestion pipeline");

        let info = self.metadata.fetch(&video_id).await?;
        let transcript = self.transcripts.fetch(&video_id).await?;
        let content = ContentSynthesizer::new(self.generator.as_ref())
            .synthesize(&transcript)
            .await?;

        let global = vlearn_models::GlobalVideo::new(video_id.clone(), info, content);
        self.cache.put(&global).await?;

        let entry = library.add_entry(&video_id).await?;

        info!(video_id = %video_id, "Video ingested and stored");
        Ok(VideoResponse::from_parts(global, entry))
    }

    /// Fetch the joined view of one video in a user's library.
    pub async fn get_user_video(
        &self,
        user_id: &str,
        video_id: &VideoId,
    ) -> IngestResult<Option<VideoResponse>> {
        let library = self.library_for(user_id);
        let Some(entry) = library.get_entry(video_id).await? else {
            return Ok(None);
        };
        let Some(global) = self.cache.get(video_id).await? else {
            // Entry without a global record: treat as absent
            warn!(video_id = %video_id, "Library entry has no global record");
            return Ok(None);
        };
        Ok(Some(VideoResponse::from_parts(global, entry)))
    }

    /// List a user's library, joined with global metadata.
    ///
    /// Entries whose global record has disappeared are skipped.
    pub async fn list_library(
        &self,
        user_id: &str,
        limit: u32,
    ) -> IngestResult<Vec<VideoLibraryItem>> {
        let entries = self.library_for(user_id).list_entries(limit).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<VideoId> = entries.iter().map(|e| e.video_id.clone()).collect();

        let mut globals = std::collections::HashMap::new();
        for chunk in ids.chunks(LIBRARY_BATCH_CHUNK) {
            for global in self.cache.batch_get(chunk).await? {
                globals.insert(global.video_id.clone(), global);
            }
        }

        let items = entries
            .iter()
            .filter_map(|entry| {
                globals
                    .get(&entry.video_id)
                    .map(|global| VideoLibraryItem::from_parts(global, entry))
            })
            .collect();

        Ok(items)
    }

    /// Get a quiz for a video, generating one if no fresh cached quiz exists.
    ///
    /// Requires the video to be in the caller's library. Cached quizzes are
    /// reused for [`QUIZ_MAX_AGE_HOURS`] hours.
    pub async fn get_or_generate_quiz(
        &self,
        user_id: &str,
        video_id: &VideoId,
        num_questions: usize,
    ) -> IngestResult<Quiz> {
        self.require_library_access(user_id, video_id).await?;

        if let Some(quiz) = self.cache.get_quiz(video_id).await? {
            if quiz.is_fresh(chrono::Duration::hours(QUIZ_MAX_AGE_HOURS)) {
                info!(video_id = %video_id, "Serving cached quiz");
                return Ok(quiz);
            }
        }

        let global = self
            .cache
            .get(video_id)
            .await?
            .ok_or_else(|| IngestError::VideoNotFound(video_id.to_string()))?;

        let quiz = QuizGenerator::new(self.generator.as_ref())
            .generate(video_id, &global.info.title, &global.content, num_questions)
            .await?;

        self.cache.put_quiz(&quiz).await?;
        Ok(quiz)
    }

    /// Return the cached quiz, if any, regardless of freshness.
    pub async fn get_cached_quiz(
        &self,
        user_id: &str,
        video_id: &VideoId,
    ) -> IngestResult<Option<Quiz>> {
        self.require_library_access(user_id, video_id).await?;
        Ok(self.cache.get_quiz(video_id).await?)
    }

    /// Answer a chat message about a video and persist both turns.
    pub async fn chat(
        &self,
        user_id: &str,
        video_id: &VideoId,
        message: &str,
    ) -> IngestResult<ChatMessage> {
        let library = self.library_for(user_id);

        let global = self
            .cache
            .get(video_id)
            .await?
            .ok_or_else(|| IngestError::VideoNotFound(video_id.to_string()))?;
        let history = library.get_chat_history(video_id).await?;

        let reply = ChatAssistant::new(self.generator.as_ref())
            .reply(&global, &history, message)
            .await?;

        let user_turn = ChatMessage::user(message.trim());
        let assistant_turn = ChatMessage::assistant(reply);
        library
            .append_chat_messages(video_id, &[user_turn, assistant_turn.clone()])
            .await?;

        Ok(assistant_turn)
    }

    async fn require_library_access(
        &self,
        user_id: &str,
        video_id: &VideoId,
    ) -> IngestResult<()> {
        let has_access = self.library_for(user_id).has_entry(video_id).await?;
        if !has_access {
            return Err(IngestError::VideoNotFound(format!(
                "Video {} is not in this user's library",
                video_id.as_str()
            )));
        }
        Ok(())
    }

    /// Per-user quiz attempt repository, for the API layer.
    pub fn quiz_attempts(&self, user_id: &str) -> QuizAttemptsRepository {
        self.attempts_for(user_id)
    }

    /// Per-user library repository, for the API layer.
    pub fn user_library(&self, user_id: &str) -> UserLibraryRepository {
        self.library_for(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_chunking_math() {
        let ids: Vec<VideoId> = (0..23)
            .map(|i| VideoId::from(format!("seed-video-{:02}", i)))
            .collect();
        let chunks: Vec<_> = ids.chunks(LIBRARY_BATCH_CHUNK).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[2].len(), 3);
    }
}
