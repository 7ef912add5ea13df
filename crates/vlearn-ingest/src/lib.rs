//! Video ingestion pipeline.
//!
//! This crate turns a canonical video ID into a stored learning record:
//! - `metadata` — YouTube Data API client
//! - `transcript` — caption fetching over a proxy-fallback strategy chain
//! - `gemini` — text generation client with model fallback
//! - `synthesizer` — concurrent content-bundle generation
//! - `quiz` — quiz generation with tolerant JSON parsing
//! - `chat` — per-video assistant replies
//! - `orchestrator` — the cache-first ingestion flow and library listing

pub mod chat;
pub mod error;
pub mod gemini;
pub mod metadata;
pub mod orchestrator;
pub mod quiz;
pub mod synthesizer;
pub mod transcript;

pub use chat::ChatAssistant;
pub use error::{IngestError, IngestResult};
pub use gemini::{GeminiClient, TextGenerator};
pub use metadata::MetadataClient;
pub use orchestrator::IngestionOrchestrator;
pub use quiz::{QuizGenerator, DEFAULT_NUM_QUESTIONS};
pub use synthesizer::ContentSynthesizer;
pub use transcript::{TranscriptFetcher, TranscriptSource};
