//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "vlearn_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vlearn_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vlearn_http_requests_in_flight";

    pub const VIDEOS_PROCESSED_TOTAL: &str = "vlearn_videos_processed_total";
    pub const QUIZZES_GENERATED_TOTAL: &str = "vlearn_quizzes_generated_total";
    pub const QUIZ_SUBMISSIONS_TOTAL: &str = "vlearn_quiz_submissions_total";
    pub const CHAT_MESSAGES_TOTAL: &str = "vlearn_chat_messages_total";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "vlearn_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a processed video, labeled by cache outcome.
pub fn record_video_processed(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::VIDEOS_PROCESSED_TOTAL, &labels).increment(1);
}

/// Record a generated quiz.
pub fn record_quiz_generated() {
    counter!(names::QUIZZES_GENERATED_TOTAL).increment(1);
}

/// Record a quiz submission.
pub fn record_quiz_submission() {
    counter!(names::QUIZ_SUBMISSIONS_TOTAL).increment(1);
}

/// Record a chat message handled.
pub fn record_chat_message() {
    counter!(names::CHAT_MESSAGES_TOTAL).increment(1);
}

/// Record a rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (collapse IDs to placeholders).
fn sanitize_path(path: &str) -> String {
    // Fixed routes carry no id and must not be collapsed
    match path {
        "/api/videos/process" | "/api/videos/library" | "/api/quiz/generate"
        | "/api/quiz/submit" | "/api/quiz/statistics" | "/api/chat/send" => {
            return path.to_string();
        }
        _ => {}
    }

    // Video ids are [A-Za-z0-9_-]+, usually but not always 11 chars
    let path = regex_lite::Regex::new(r"/videos/[A-Za-z0-9_-]+")
        .expect("valid regex")
        .replace_all(path, "/videos/:video_id");
    let path = regex_lite::Regex::new(r"/(quiz|chat)/(history|reset)/[A-Za-z0-9_-]+$")
        .expect("valid regex")
        .replace_all(&path, "/$1/$2/:video_id");
    let path = regex_lite::Regex::new(r"/(quiz|chat)/[A-Za-z0-9_-]+$")
        .expect("valid regex")
        .replace_all(&path, "/$1/:video_id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_video_paths() {
        assert_eq!(
            sanitize_path("/api/videos/dQw4w9WgXcQ/progress"),
            "/api/videos/:video_id/progress"
        );
        assert_eq!(
            sanitize_path("/api/quiz/history/dQw4w9WgXcQ"),
            "/api/quiz/history/:video_id"
        );
        assert_eq!(
            sanitize_path("/api/quiz/dQw4w9WgXcQ"),
            "/api/quiz/:video_id"
        );
        assert_eq!(sanitize_path("/api/videos/library"), "/api/videos/library");
    }

    #[test]
    fn test_sanitize_short_ids_and_fixed_routes() {
        assert_eq!(sanitize_path("/api/videos/abc123"), "/api/videos/:video_id");
        assert_eq!(
            sanitize_path("/api/chat/history/abc123"),
            "/api/chat/history/:video_id"
        );
        assert_eq!(sanitize_path("/api/quiz/statistics"), "/api/quiz/statistics");
        assert_eq!(sanitize_path("/api/chat/send"), "/api/chat/send");
    }
}
