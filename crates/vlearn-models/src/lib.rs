//! Shared data models for the vlearn backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video identity, metadata and generated learning content
//! - User library entries (progress, favorites, notes)
//! - Quizzes, quiz attempts and aggregate statistics
//! - Chat messages and history

pub mod chat;
pub mod quiz;
pub mod url;
pub mod video;

// Re-export common types
pub use chat::{ChatMessage, ChatRole};
pub use quiz::{Quiz, QuizAnswer, QuizAttempt, QuizQuestion, QuizResult, QuizStatistics};
pub use url::{resolve_video_id, VideoUrlError, VideoUrlResult};
pub use video::{
    GlobalVideo, UserVideoEntry, VideoContent, VideoId, VideoInfo, VideoLibraryItem, VideoResponse,
};
