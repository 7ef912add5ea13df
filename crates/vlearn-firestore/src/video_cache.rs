//! Global video cache repository.
//!
//! The `videos` collection is shared by every user: one document per
//! canonical video ID, holding metadata, the generated content bundle and an
//! optional cached quiz. Records are never deleted.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use vlearn_models::{GlobalVideo, Quiz, VideoId};

use crate::client::FirestoreClient;
use crate::convert::{from_document, json_to_value, to_document_fields, value_to_json};
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{DocumentMask, Value};

/// Collection holding one document per canonical video ID.
const COLLECTION: &str = "videos";

/// How long a cached quiz stays fresh.
pub const QUIZ_MAX_AGE_HOURS: i64 = 24;

/// Repository for the global video cache.
#[derive(Clone)]
pub struct VideoCacheRepository {
    client: FirestoreClient,
}

impl VideoCacheRepository {
    const MAX_TOUCH_RETRIES: u32 = 5;

    /// Top-level fields owned by [`GlobalVideo`]. Writes are masked to these
    /// so the cached quiz on the same document survives a re-put.
    const RECORD_FIELDS: [&'static str; 6] = [
        "video_id",
        "info",
        "content",
        "processed_at",
        "last_accessed",
        "processed_count",
    ];

    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Get a global record by canonical ID.
    pub async fn get(&self, video_id: &VideoId) -> FirestoreResult<Option<GlobalVideo>> {
        let doc = self.client.get_document(COLLECTION, video_id.as_str()).await?;

        match doc {
            Some(d) => Ok(Some(from_document(&d)?)),
            None => Ok(None),
        }
    }

    /// Store a global record, replacing any previous version.
    ///
    /// Concurrent ingestions of the same ID are last-write-wins.
    pub async fn put(&self, record: &GlobalVideo) -> FirestoreResult<()> {
        let fields = to_document_fields(record)?;
        let mask: Vec<String> = Self::RECORD_FIELDS.iter().map(|f| f.to_string()).collect();

        self.client
            .update_document(COLLECTION, record.video_id.as_str(), fields, Some(mask))
            .await?;
        info!("Stored global video record: {}", record.video_id);
        Ok(())
    }

    /// Bump `last_accessed` and `processed_count` on a cache hit.
    ///
    /// Uses read-increment-write with an updateTime precondition so
    /// concurrent touches never lose increments; retries a bounded number of
    /// times on contention.
    pub async fn touch(&self, video_id: &VideoId) -> FirestoreResult<u64> {
        let mut last_error = None;

        for attempt in 0..Self::MAX_TOUCH_RETRIES {
            let doc = self.client.get_document(COLLECTION, video_id.as_str()).await?;

            let (current_count, update_time) = match &doc {
                Some(d) => {
                    let count = d
                        .fields
                        .as_ref()
                        .and_then(|f| f.get("processed_count"))
                        .and_then(|v| match v {
                            Value::IntegerValue(s) => s.parse::<u64>().ok(),
                            Value::DoubleValue(f) => Some(*f as u64),
                            _ => None,
                        })
                        .unwrap_or(0);
                    (count, d.update_time.clone())
                }
                None => {
                    return Err(FirestoreError::not_found(format!(
                        "Video {} not found",
                        video_id.as_str()
                    )));
                }
            };

            let new_count = current_count.saturating_add(1);

            let mut fields = HashMap::new();
            fields.insert(
                "processed_count".to_string(),
                Value::IntegerValue(new_count.to_string()),
            );
            fields.insert(
                "last_accessed".to_string(),
                json_to_value(&serde_json::to_value(Utc::now())?),
            );

            let update_mask = vec![
                "processed_count".to_string(),
                "last_accessed".to_string(),
            ];

            match self
                .client
                .update_document_with_precondition(
                    COLLECTION,
                    video_id.as_str(),
                    fields,
                    Some(update_mask),
                    update_time.as_deref(),
                )
                .await
            {
                Ok(_) => {
                    return Ok(new_count);
                }
                Err(e) if e.is_precondition_failed() => {
                    // Another touch landed first; retry with fresh state
                    debug!(
                        "Access-count update precondition failed for {} (attempt {}), retrying",
                        video_id.as_str(),
                        attempt + 1
                    );
                    last_error = Some(e);
                    tokio::time::sleep(std::time::Duration::from_millis(
                        50 * (attempt as u64 + 1),
                    ))
                    .await;
                    continue;
                }
                Err(e) => {
                    return Err(e);
                }
            }
        }

        warn!(
            "Access-count update failed after {} retries for {}: {:?}",
            Self::MAX_TOUCH_RETRIES,
            video_id.as_str(),
            last_error
        );
        Err(FirestoreError::request_failed(format!(
            "Failed to update access count after {} retries",
            Self::MAX_TOUCH_RETRIES
        )))
    }

    /// Get the cached quiz for a video, if one was generated.
    pub async fn get_quiz(&self, video_id: &VideoId) -> FirestoreResult<Option<Quiz>> {
        let doc = self.client.get_document(COLLECTION, video_id.as_str()).await?;

        let Some(doc) = doc else {
            return Ok(None);
        };

        let Some(quiz_value) = doc.fields.as_ref().and_then(|f| f.get("quiz")) else {
            return Ok(None);
        };

        let quiz: Quiz = serde_json::from_value(value_to_json(quiz_value))?;
        Ok(Some(quiz))
    }

    /// Cache a generated quiz on the global record.
    pub async fn put_quiz(&self, quiz: &Quiz) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("quiz".to_string(), json_to_value(&serde_json::to_value(quiz)?));

        self.client
            .update_document(
                COLLECTION,
                quiz.video_id.as_str(),
                fields,
                Some(vec!["quiz".to_string()]),
            )
            .await?;
        info!("Cached quiz for video: {}", quiz.video_id);
        Ok(())
    }

    /// Full document names for a chunk of IDs, for batchGet joins.
    pub fn full_names(&self, ids: &[VideoId]) -> Vec<String> {
        ids.iter()
            .map(|id| self.client.full_document_name(COLLECTION, id.as_str()))
            .collect()
    }

    /// Fetch multiple global records at once.
    ///
    /// At most 100 IDs per call (Firestore batchGet limit); missing records
    /// are omitted from the result.
    pub async fn batch_get(&self, ids: &[VideoId]) -> FirestoreResult<Vec<GlobalVideo>> {
        let names = self.full_names(ids);
        let docs = self
            .client
            .batch_get_documents(
                names,
                Some(DocumentMask {
                    field_paths: Self::RECORD_FIELDS.iter().map(|f| f.to_string()).collect(),
                }),
            )
            .await?;

        let mut records = Vec::with_capacity(docs.len());
        for doc in &docs {
            match from_document::<GlobalVideo>(doc) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        doc_id = doc.doc_id().unwrap_or(""),
                        error = %e,
                        "Failed to parse global video document"
                    );
                }
            }
        }
        Ok(records)
    }
}
