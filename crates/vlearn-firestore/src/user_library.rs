//! Per-user video library repository.
//!
//! Documents live at `users/{uid}/videos/{video_id}` and hold only
//! user-specific state: progress, favorite flag, notes and the chat history.
//! The shared metadata and content stay on the global record.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info};

use vlearn_models::{ChatMessage, UserVideoEntry, VideoId};

use crate::client::FirestoreClient;
use crate::convert::{from_document, json_to_value, to_document_fields};
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{CollectionSelector, FieldReference, Order, StructuredQuery, Write};

/// Repository for one user's video library.
pub struct UserLibraryRepository {
    client: FirestoreClient,
    user_id: String,
}

impl UserLibraryRepository {
    /// Create a repository scoped to one user.
    pub fn new(client: FirestoreClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
        }
    }

    /// Collection path for this user's library.
    fn collection(&self) -> String {
        format!("users/{}/videos", self.user_id)
    }

    /// Get a library entry.
    pub async fn get_entry(&self, video_id: &VideoId) -> FirestoreResult<Option<UserVideoEntry>> {
        let doc = self
            .client
            .get_document(&self.collection(), video_id.as_str())
            .await?;

        match doc {
            Some(d) => Ok(Some(from_document(&d)?)),
            None => Ok(None),
        }
    }

    /// Whether this user already has the video in their library.
    pub async fn has_entry(&self, video_id: &VideoId) -> FirestoreResult<bool> {
        Ok(self.get_entry(video_id).await?.is_some())
    }

    /// Add a fresh entry if none exists.
    ///
    /// An existing entry is left untouched so progress and notes are never
    /// clobbered by re-processing the same video. Returns the entry that is
    /// now in place.
    pub async fn add_entry(&self, video_id: &VideoId) -> FirestoreResult<UserVideoEntry> {
        let entry = UserVideoEntry::new(video_id.clone());
        let fields = to_document_fields(&entry)?;

        match self
            .client
            .create_document(&self.collection(), video_id.as_str(), fields)
            .await
        {
            Ok(_) => {
                info!(user_id = %self.user_id, video_id = %video_id, "Added library entry");
                Ok(entry)
            }
            Err(FirestoreError::AlreadyExists(_)) => {
                debug!(user_id = %self.user_id, video_id = %video_id, "Library entry already present");
                match self.get_entry(video_id).await? {
                    Some(existing) => Ok(existing),
                    // Deleted between the conflict and the read; treat ours as current
                    None => Ok(entry),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// List entries ordered by `added_at` descending.
    pub async fn list_entries(&self, limit: u32) -> FirestoreResult<Vec<UserVideoEntry>> {
        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: "videos".to_string(),
                all_descendants: None,
            }],
            r#where: None,
            order_by: Some(vec![Order {
                field: FieldReference {
                    field_path: "added_at".to_string(),
                },
                direction: "DESCENDING".to_string(),
            }]),
            start_at: None,
            limit: Some(limit.clamp(1, 100) as i32),
        };

        let parent_path = format!("users/{}", self.user_id);
        let docs = self.client.run_query(&parent_path, query).await?;

        let mut entries = Vec::with_capacity(docs.len());
        for doc in &docs {
            match from_document::<UserVideoEntry>(doc) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(
                        user_id = %self.user_id,
                        doc_id = doc.doc_id().unwrap_or(""),
                        error = %e,
                        "Failed to parse library entry"
                    );
                }
            }
        }
        Ok(entries)
    }

    /// Update watch progress; also bumps `last_watched`.
    ///
    /// The value is validated to `[0.0, 1.0]` at the API boundary. Fails
    /// with NotFound if the entry does not exist; the update never creates
    /// a partial entry document.
    pub async fn update_progress(&self, video_id: &VideoId, progress: f64) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(
            "progress".to_string(),
            crate::types::Value::DoubleValue(progress),
        );
        fields.insert(
            "last_watched".to_string(),
            json_to_value(&serde_json::to_value(Utc::now())?),
        );

        self.client
            .update_document_existing(
                &self.collection(),
                video_id.as_str(),
                fields,
                Some(vec!["progress".to_string(), "last_watched".to_string()]),
            )
            .await?;
        Ok(())
    }

    /// Set or clear the favorite flag. NotFound if the entry does not exist.
    pub async fn set_favorite(&self, video_id: &VideoId, is_favorite: bool) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(
            "is_favorite".to_string(),
            crate::types::Value::BooleanValue(is_favorite),
        );

        self.client
            .update_document_existing(
                &self.collection(),
                video_id.as_str(),
                fields,
                Some(vec!["is_favorite".to_string()]),
            )
            .await?;
        Ok(())
    }

    /// Replace the user's notes for this video. NotFound if the entry does
    /// not exist.
    pub async fn set_notes(&self, video_id: &VideoId, notes: &str) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(
            "notes".to_string(),
            crate::types::Value::StringValue(notes.to_string()),
        );

        self.client
            .update_document_existing(
                &self.collection(),
                video_id.as_str(),
                fields,
                Some(vec!["notes".to_string()]),
            )
            .await?;
        Ok(())
    }

    /// Remove the library reference. The global record stays.
    pub async fn remove_entry(&self, video_id: &VideoId) -> FirestoreResult<()> {
        self.client
            .delete_document(&self.collection(), video_id.as_str())
            .await?;
        info!(user_id = %self.user_id, video_id = %video_id, "Removed library entry");
        Ok(())
    }

    // =========================================================================
    // Chat history (stored on the entry document)
    // =========================================================================

    /// Get the chat history, oldest first.
    pub async fn get_chat_history(&self, video_id: &VideoId) -> FirestoreResult<Vec<ChatMessage>> {
        match self.get_entry(video_id).await? {
            Some(entry) => Ok(entry.chat_history),
            None => Err(FirestoreError::not_found(format!(
                "users/{}/videos/{}",
                self.user_id,
                video_id.as_str()
            ))),
        }
    }

    /// Append messages to the chat history, preserving insertion order.
    ///
    /// Uses a server-side array-append transform so concurrent appends never
    /// overwrite each other; NotFound if the entry does not exist.
    pub async fn append_chat_messages(
        &self,
        video_id: &VideoId,
        messages: &[ChatMessage],
    ) -> FirestoreResult<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut values = Vec::with_capacity(messages.len());
        for message in messages {
            values.push(json_to_value(&serde_json::to_value(message)?));
        }

        let name = self
            .client
            .full_document_name(&self.collection(), video_id.as_str());

        self.client
            .batch_write(vec![Write::append_to_array(name, "chat_history", values)])
            .await?;
        Ok(())
    }

    /// Clear the chat history. NotFound if the entry does not exist.
    pub async fn clear_chat_history(&self, video_id: &VideoId) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(
            "chat_history".to_string(),
            json_to_value(&serde_json::json!([])),
        );

        self.client
            .update_document_existing(
                &self.collection(),
                video_id.as_str(),
                fields,
                Some(vec!["chat_history".to_string()]),
            )
            .await?;
        Ok(())
    }
}
