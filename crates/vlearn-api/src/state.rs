//! Application state.

use std::sync::Arc;

use vlearn_firestore::FirestoreClient;
use vlearn_ingest::{GeminiClient, IngestionOrchestrator, MetadataClient, TranscriptFetcher};

use crate::auth::JwksCache;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub firestore: FirestoreClient,
    pub orchestrator: Arc<IngestionOrchestrator>,
    pub jwks: Arc<JwksCache>,
}

impl AppState {
    /// Create new application state from environment configuration.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let firestore = FirestoreClient::from_env().await?;
        let jwks = JwksCache::new().await?;

        let metadata = MetadataClient::from_env()?;
        let transcripts = TranscriptFetcher::from_env()?;
        let generator = Arc::new(GeminiClient::from_env()?);

        let orchestrator = IngestionOrchestrator::new(
            firestore.clone(),
            metadata,
            transcripts,
            generator,
        );

        Ok(Self {
            config,
            firestore,
            orchestrator: Arc::new(orchestrator),
            jwks: Arc::new(jwks),
        })
    }
}
