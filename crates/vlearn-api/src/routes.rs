//! API routes.

use axum::middleware;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::chat::{clear_chat_history, get_chat_history, send_message};
use crate::handlers::health::{health, ready};
use crate::handlers::quiz::{
    generate_quiz, get_quiz, get_quiz_history, get_quiz_statistics, reset_quiz_data, submit_quiz,
};
use crate::handlers::videos::{
    get_library, get_video, process_video, remove_video, set_favorite, update_notes,
    update_progress,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let video_routes = Router::new()
        .route("/videos/process", post(process_video))
        .route("/videos/library", get(get_library))
        .route("/videos/:video_id", get(get_video))
        .route("/videos/:video_id", delete(remove_video))
        .route("/videos/:video_id/progress", patch(update_progress))
        .route("/videos/:video_id/favorite", patch(set_favorite))
        .route("/videos/:video_id/notes", patch(update_notes));

    let quiz_routes = Router::new()
        .route("/quiz/generate", post(generate_quiz))
        .route("/quiz/submit", post(submit_quiz))
        .route("/quiz/statistics", get(get_quiz_statistics))
        .route("/quiz/history/:video_id", get(get_quiz_history))
        .route("/quiz/reset/:video_id", delete(reset_quiz_data))
        .route("/quiz/:video_id", get(get_quiz));

    let chat_routes = Router::new()
        .route("/chat/send", post(send_message))
        .route("/chat/history/:video_id", get(get_chat_history))
        .route("/chat/history/:video_id", delete(clear_chat_history));

    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(video_routes)
        .merge(quiz_routes)
        .merge(chat_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
