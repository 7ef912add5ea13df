//! Quiz handlers: generation, submission, history and statistics.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use vlearn_models::{Quiz, QuizAnswer, QuizAttempt, QuizResult};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::videos::parse_video_id;
use crate::metrics;
use crate::state::AppState;

const MIN_QUESTIONS: usize = 1;
const MAX_QUESTIONS: usize = 20;

#[derive(Deserialize)]
pub struct GenerateQuizRequest {
    pub video_id: String,
    pub num_questions: Option<usize>,
}

/// Generate a quiz (or serve the cached one while fresh).
pub async fn generate_quiz(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<GenerateQuizRequest>,
) -> ApiResult<Json<Quiz>> {
    let video_id = parse_video_id(&request.video_id)?;

    let num_questions = request
        .num_questions
        .unwrap_or(vlearn_ingest::DEFAULT_NUM_QUESTIONS);
    if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&num_questions) {
        return Err(ApiError::bad_request(format!(
            "num_questions must be between {} and {}",
            MIN_QUESTIONS, MAX_QUESTIONS
        )));
    }

    let quiz = state
        .orchestrator
        .get_or_generate_quiz(&user.uid, &video_id, num_questions)
        .await?;

    metrics::record_quiz_generated();
    Ok(Json(quiz))
}

/// Return the cached quiz for a video, regardless of freshness.
pub async fn get_quiz(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<Quiz>> {
    let video_id = parse_video_id(&video_id)?;

    state
        .orchestrator
        .get_cached_quiz(&user.uid, &video_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No quiz generated for this video"))
}

#[derive(Deserialize)]
pub struct SubmitQuizRequest {
    pub video_id: String,
    pub answers: Vec<QuizAnswer>,
    /// Client-reported seconds spent on the quiz.
    #[serde(default)]
    pub time_taken: u32,
}

/// Score a submission against the cached quiz and persist the attempt.
pub async fn submit_quiz(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SubmitQuizRequest>,
) -> ApiResult<Json<QuizResult>> {
    let video_id = parse_video_id(&request.video_id)?;

    let quiz = state
        .orchestrator
        .get_cached_quiz(&user.uid, &video_id)
        .await?
        .ok_or_else(|| {
            ApiError::bad_request("Quiz not found. Please generate a quiz first.")
        })?;

    if request.answers.len() != quiz.questions.len() {
        return Err(ApiError::bad_request(
            "Number of answers doesn't match number of questions",
        ));
    }

    let mut correct_answers = Vec::new();
    for (i, (answer, question)) in request
        .answers
        .iter()
        .zip(quiz.questions.iter())
        .enumerate()
    {
        if answer.question_index != i {
            return Err(ApiError::bad_request(format!(
                "Answer index mismatch at question {}",
                i
            )));
        }
        if answer.selected_answer == question.correct_answer {
            correct_answers.push(i);
        }
    }

    let attempt = QuizAttempt {
        video_id: video_id.clone(),
        score: correct_answers.len() as u32,
        total_questions: quiz.questions.len() as u32,
        correct_answers,
        submitted_at: Utc::now(),
        time_taken: request.time_taken,
    };

    let stats = state
        .orchestrator
        .quiz_attempts(&user.uid)
        .save_attempt(&attempt)
        .await?;

    metrics::record_quiz_submission();
    info!(
        uid = %user.uid,
        video_id = %video_id,
        score = attempt.score,
        attempts = stats.total_attempts,
        "Quiz submitted"
    );

    Ok(Json(QuizResult {
        result: attempt,
        questions: quiz.questions,
    }))
}

#[derive(Serialize)]
pub struct QuizHistoryResponse {
    pub attempts: Vec<QuizAttempt>,
}

/// Most recent attempts for a video, newest first.
pub async fn get_quiz_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<QuizHistoryResponse>> {
    let video_id = parse_video_id(&video_id)?;
    let attempts = state
        .orchestrator
        .quiz_attempts(&user.uid)
        .history(&video_id)
        .await?;
    Ok(Json(QuizHistoryResponse { attempts }))
}

/// Account-wide quiz statistics roll-up.
#[derive(Debug, Serialize)]
pub struct QuizAccountSummary {
    pub total_videos_with_quizzes: u32,
    pub total_quiz_attempts: u32,
    pub overall_average_score: f64,
    pub best_overall_score: u32,
    pub completion_rate: f64,
}

pub async fn get_quiz_statistics(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<QuizAccountSummary>> {
    let all = state
        .orchestrator
        .quiz_attempts(&user.uid)
        .all_statistics()
        .await?;

    let mut total_videos = 0u32;
    let mut total_attempts = 0u32;
    let mut total_score = 0u32;
    let mut best_overall = 0u32;

    for stats in all.values() {
        if stats.total_attempts == 0 {
            continue;
        }
        total_videos += 1;
        total_attempts += stats.total_attempts;
        total_score += stats.total_score;
        best_overall = best_overall.max(stats.best_score);
    }

    let (overall_average, completion_rate) = if total_attempts > 0 {
        (
            round2(f64::from(total_score) / f64::from(total_attempts)),
            round2(f64::from(total_videos) / f64::from(total_attempts) * 100.0),
        )
    } else {
        (0.0, 0.0)
    };

    Ok(Json(QuizAccountSummary {
        total_videos_with_quizzes: total_videos,
        total_quiz_attempts: total_attempts,
        overall_average_score: overall_average,
        best_overall_score: best_overall,
        completion_rate,
    }))
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub status: String,
    pub deleted_attempts: u32,
}

/// Delete all attempts and statistics for one video.
pub async fn reset_quiz_data(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<ResetResponse>> {
    let video_id = parse_video_id(&video_id)?;
    let deleted = state
        .orchestrator
        .quiz_attempts(&user.uid)
        .reset(&video_id)
        .await?;

    info!(uid = %user.uid, video_id = %video_id, deleted, "Quiz data reset");
    Ok(Json(ResetResponse {
        status: "success".to_string(),
        deleted_attempts: deleted,
    }))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(round2(50.0), 50.0);
    }
}
