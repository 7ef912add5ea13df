//! Quiz attempt persistence.
//!
//! Per-user layout:
//! - `users/{uid}/quizzes/{video_id}` — aggregate statistics document
//! - `users/{uid}/quizzes/{video_id}/attempts/{attempt_id}` — one document
//!   per scored attempt

use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use vlearn_models::{QuizAttempt, QuizStatistics, VideoId};

use crate::client::FirestoreClient;
use crate::convert::{from_document, to_document_fields};
use crate::error::FirestoreResult;
use crate::types::{CollectionSelector, FieldReference, Order, StructuredQuery, Write};

/// How many attempts the history endpoint returns.
pub const HISTORY_LIMIT: u32 = 10;

/// Repository for one user's quiz attempts and statistics.
pub struct QuizAttemptsRepository {
    client: FirestoreClient,
    user_id: String,
}

impl QuizAttemptsRepository {
    pub fn new(client: FirestoreClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
        }
    }

    /// Collection of per-video stats documents.
    fn stats_collection(&self) -> String {
        format!("users/{}/quizzes", self.user_id)
    }

    /// Attempts subcollection for one video.
    fn attempts_collection(&self, video_id: &VideoId) -> String {
        format!(
            "users/{}/quizzes/{}/attempts",
            self.user_id,
            video_id.as_str()
        )
    }

    /// Persist a scored attempt and fold it into the aggregate statistics.
    pub async fn save_attempt(&self, attempt: &QuizAttempt) -> FirestoreResult<QuizStatistics> {
        let attempt_id = Uuid::new_v4().to_string();
        let fields = to_document_fields(attempt)?;

        self.client
            .create_document(&self.attempts_collection(&attempt.video_id), &attempt_id, fields)
            .await?;

        // Merge into the stats doc. Concurrent submissions from the same
        // user are rare enough that read-modify-write is acceptable here.
        let mut stats = self
            .get_statistics(&attempt.video_id)
            .await?
            .unwrap_or_default();
        stats.record(attempt);

        let stats_fields = to_document_fields(&stats)?;
        self.client
            .update_document(
                &self.stats_collection(),
                attempt.video_id.as_str(),
                stats_fields,
                None,
            )
            .await?;

        info!(
            user_id = %self.user_id,
            video_id = %attempt.video_id,
            score = attempt.score,
            "Saved quiz attempt"
        );
        Ok(stats)
    }

    /// Aggregate statistics for one video, if any attempts exist.
    pub async fn get_statistics(
        &self,
        video_id: &VideoId,
    ) -> FirestoreResult<Option<QuizStatistics>> {
        let doc = self
            .client
            .get_document(&self.stats_collection(), video_id.as_str())
            .await?;

        match doc {
            Some(d) => Ok(Some(from_document(&d)?)),
            None => Ok(None),
        }
    }

    /// Recent attempts for one video, newest first.
    pub async fn history(&self, video_id: &VideoId) -> FirestoreResult<Vec<QuizAttempt>> {
        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: "attempts".to_string(),
                all_descendants: None,
            }],
            r#where: None,
            order_by: Some(vec![Order {
                field: FieldReference {
                    field_path: "submitted_at".to_string(),
                },
                direction: "DESCENDING".to_string(),
            }]),
            start_at: None,
            limit: Some(HISTORY_LIMIT as i32),
        };

        let parent_path = format!(
            "users/{}/quizzes/{}",
            self.user_id,
            video_id.as_str()
        );
        let docs = self.client.run_query(&parent_path, query).await?;

        let mut attempts = Vec::with_capacity(docs.len());
        for doc in &docs {
            match from_document::<QuizAttempt>(doc) {
                Ok(attempt) => attempts.push(attempt),
                Err(e) => {
                    warn!(
                        user_id = %self.user_id,
                        doc_id = doc.doc_id().unwrap_or(""),
                        error = %e,
                        "Failed to parse quiz attempt"
                    );
                }
            }
        }
        Ok(attempts)
    }

    /// Account-wide statistics: per-video aggregates keyed by video ID.
    pub async fn all_statistics(&self) -> FirestoreResult<HashMap<String, QuizStatistics>> {
        let mut all = HashMap::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_documents(&self.stats_collection(), Some(100), page_token.as_deref())
                .await?;

            for doc in page.documents.unwrap_or_default() {
                let Some(video_id) = doc.doc_id().map(str::to_string) else {
                    continue;
                };
                match from_document::<QuizStatistics>(&doc) {
                    Ok(stats) => {
                        all.insert(video_id, stats);
                    }
                    Err(e) => {
                        warn!(
                            user_id = %self.user_id,
                            video_id = %video_id,
                            error = %e,
                            "Failed to parse quiz statistics"
                        );
                    }
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(all)
    }

    /// Delete all attempts and the stats doc for one video.
    pub async fn reset(&self, video_id: &VideoId) -> FirestoreResult<u32> {
        let attempts_collection = self.attempts_collection(video_id);
        let mut deleted = 0u32;
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_documents(&attempts_collection, Some(100), page_token.as_deref())
                .await?;

            let names: Vec<String> = page
                .documents
                .unwrap_or_default()
                .into_iter()
                .filter_map(|d| d.name)
                .collect();

            if !names.is_empty() {
                deleted += names.len() as u32;
                let writes: Vec<Write> = names.into_iter().map(Write::delete).collect();
                self.client.batch_write(writes).await?;
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        self.client
            .delete_document(&self.stats_collection(), video_id.as_str())
            .await?;

        info!(
            user_id = %self.user_id,
            video_id = %video_id,
            deleted_attempts = deleted,
            "Reset quiz data"
        );
        Ok(deleted)
    }
}
