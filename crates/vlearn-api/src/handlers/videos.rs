//! Video library handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use vlearn_models::{VideoId, VideoLibraryItem, VideoResponse};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const DEFAULT_LIBRARY_LIMIT: u32 = 50;

/// Validate a path-supplied video id (canonical `[A-Za-z0-9_-]+` form).
pub(crate) fn parse_video_id(raw: &str) -> ApiResult<VideoId> {
    if !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        Ok(VideoId::from(raw))
    } else {
        Err(ApiError::bad_request("Invalid video ID format"))
    }
}

#[derive(Deserialize)]
pub struct ProcessVideoRequest {
    pub url: String,
}

/// Process a video URL: resolve, ingest (or serve cached), link to library.
pub async fn process_video(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ProcessVideoRequest>,
) -> ApiResult<Json<VideoResponse>> {
    if request.url.trim().is_empty() {
        return Err(ApiError::bad_request("URL cannot be empty"));
    }

    info!(uid = %user.uid, "Processing video request");

    let response = state
        .orchestrator
        .process_video(&user.uid, request.url.trim())
        .await?;

    metrics::record_video_processed("success");
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct LibraryQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct LibraryResponse {
    pub videos: Vec<VideoLibraryItem>,
}

/// List the caller's library, most recently added first.
pub async fn get_library(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LibraryQuery>,
) -> ApiResult<Json<LibraryResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIBRARY_LIMIT);
    let videos = state.orchestrator.list_library(&user.uid, limit).await?;
    Ok(Json(LibraryResponse { videos }))
}

/// Fetch the combined view of one library video.
pub async fn get_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoResponse>> {
    let video_id = parse_video_id(&video_id)?;

    state
        .orchestrator
        .get_user_video(&user.uid, &video_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Video not found in your library"))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
}

fn ok_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "success".to_string(),
    })
}

/// Remove a video from the caller's library. The global record stays.
pub async fn remove_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let video_id = parse_video_id(&video_id)?;
    state
        .orchestrator
        .user_library(&user.uid)
        .remove_entry(&video_id)
        .await?;
    Ok(ok_status())
}

#[derive(Deserialize)]
pub struct UpdateProgressRequest {
    pub progress: f64,
}

/// Watch progress is a fraction; NaN fails the range check too.
fn validate_progress(progress: f64) -> ApiResult<()> {
    if (0.0..=1.0).contains(&progress) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Progress must be between 0.0 and 1.0"))
    }
}

/// Update watch progress; also stamps `last_watched`.
pub async fn update_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
    Json(request): Json<UpdateProgressRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let video_id = parse_video_id(&video_id)?;
    validate_progress(request.progress)?;

    state
        .orchestrator
        .user_library(&user.uid)
        .update_progress(&video_id, request.progress)
        .await?;
    Ok(ok_status())
}

#[derive(Deserialize)]
pub struct FavoriteRequest {
    pub is_favorite: bool,
}

pub async fn set_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
    Json(request): Json<FavoriteRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let video_id = parse_video_id(&video_id)?;
    state
        .orchestrator
        .user_library(&user.uid)
        .set_favorite(&video_id, request.is_favorite)
        .await?;
    Ok(ok_status())
}

#[derive(Deserialize)]
pub struct NotesRequest {
    pub notes: String,
}

const MAX_NOTES_LENGTH: usize = 10_000;

pub async fn update_notes(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
    Json(request): Json<NotesRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let video_id = parse_video_id(&video_id)?;

    if request.notes.len() > MAX_NOTES_LENGTH {
        return Err(ApiError::bad_request("Notes exceed maximum length"));
    }

    state
        .orchestrator
        .user_library(&user.uid)
        .set_notes(&video_id, &request.notes)
        .await?;
    Ok(ok_status())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_id_accepts_canonical_form() {
        assert!(parse_video_id("dQw4w9WgXcQ").is_ok());
        assert!(parse_video_id("a_b-c_d-e_f").is_ok());
        // Non-standard lengths are valid ids too
        assert!(parse_video_id("abc123").is_ok());
        assert!(parse_video_id("abc123def456789").is_ok());
    }

    #[test]
    fn test_parse_video_id_rejects_bad_input() {
        assert!(parse_video_id("dQw4w9WgXc!").is_err());
        assert!(parse_video_id("a b c").is_err());
        assert!(parse_video_id("").is_err());
    }

    #[test]
    fn test_validate_progress_accepts_fractions() {
        assert!(validate_progress(0.0).is_ok());
        assert!(validate_progress(0.9).is_ok());
        assert!(validate_progress(1.0).is_ok());
    }

    #[test]
    fn test_validate_progress_rejects_out_of_range() {
        assert!(validate_progress(1.5).is_err());
        assert!(validate_progress(-0.1).is_err());
        assert!(validate_progress(f64::NAN).is_err());
    }
}
