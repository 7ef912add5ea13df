//! Quiz models: questions, attempts and aggregate statistics.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::video::VideoId;

/// A single multiple-choice question.
///
/// `options` always has exactly four entries and `correct_answer` is always
/// one of them; the repair pass in the generator enforces both.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

/// A generated quiz, cached on the global video record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Quiz {
    pub video_id: VideoId,
    pub questions: Vec<QuizQuestion>,
    pub generated_at: DateTime<Utc>,
}

impl Quiz {
    /// Whether this cached quiz is still fresh.
    pub fn is_fresh(&self, max_age: chrono::Duration) -> bool {
        Utc::now() - self.generated_at < max_age
    }
}

/// One answer within a submission, by question index.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuizAnswer {
    pub question_index: usize,
    pub selected_answer: String,
}

/// A scored quiz attempt as persisted per user.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuizAttempt {
    pub video_id: VideoId,
    pub score: u32,
    pub total_questions: u32,
    /// Indices of the questions answered correctly.
    pub correct_answers: Vec<usize>,
    pub submitted_at: DateTime<Utc>,
    /// Client-reported seconds; informational only.
    #[serde(default)]
    pub time_taken: u32,
}

/// Scored submission returned to the client, with the questions for review.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuizResult {
    pub result: QuizAttempt,
    pub questions: Vec<QuizQuestion>,
}

/// Aggregate statistics across a user's attempts for one video.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct QuizStatistics {
    #[serde(default)]
    pub total_attempts: u32,
    #[serde(default)]
    pub total_score: u32,
    #[serde(default)]
    pub best_score: u32,
    #[serde(default)]
    pub average_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
}

impl QuizStatistics {
    /// Fold a new attempt into the aggregate.
    pub fn record(&mut self, attempt: &QuizAttempt) {
        self.total_attempts += 1;
        self.total_score += attempt.score;
        self.best_score = self.best_score.max(attempt.score);
        self.average_score = f64::from(self.total_score) / f64::from(self.total_attempts);
        self.last_attempt = Some(attempt.submitted_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(score: u32) -> QuizAttempt {
        QuizAttempt {
            video_id: "dQw4w9WgXcQ".into(),
            score,
            total_questions: 5,
            correct_answers: vec![],
            submitted_at: Utc::now(),
            time_taken: 0,
        }
    }

    #[test]
    fn test_statistics_merge() {
        let mut stats = QuizStatistics::default();
        stats.record(&attempt(3));
        stats.record(&attempt(5));
        stats.record(&attempt(1));

        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.total_score, 9);
        assert_eq!(stats.best_score, 5);
        assert!((stats.average_score - 3.0).abs() < f64::EPSILON);
        assert!(stats.last_attempt.is_some());
    }

    #[test]
    fn test_quiz_freshness_window() {
        let mut quiz = Quiz {
            video_id: "dQw4w9WgXcQ".into(),
            questions: vec![],
            generated_at: Utc::now(),
        };
        assert!(quiz.is_fresh(chrono::Duration::hours(24)));

        quiz.generated_at = Utc::now() - chrono::Duration::hours(25);
        assert!(!quiz.is_fresh(chrono::Duration::hours(24)));
    }
}
