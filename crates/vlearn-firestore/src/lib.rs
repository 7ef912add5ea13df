//! Firestore REST API client and typed repositories.
//!
//! This crate provides:
//! - A Firestore REST client with token caching, retry and metrics
//! - The global video cache repository (`videos` collection)
//! - Per-user library and quiz-attempt repositories
//! - serde_json <-> Firestore value conversion

pub mod client;
pub mod convert;
pub mod error;
pub mod metrics;
pub mod quiz_attempts;
pub mod retry;
pub mod token_cache;
pub mod types;
pub mod user_library;
pub mod video_cache;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use quiz_attempts::QuizAttemptsRepository;
pub use types::{Document, Value};
pub use user_library::UserLibraryRepository;
pub use video_cache::{VideoCacheRepository, QUIZ_MAX_AGE_HOURS};
