pub mod exam;
pub mod health;
pub mod invitation;
pub mod student;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::auth::{require_bearer_auth, require_faculty, require_student};
use crate::AppState;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let faculty_api = Router::new()
        .route("/api/exam/create", post(exam::create_exam))
        .route("/api/exam/mine", get(exam::list_my_exams))
        .route(
            "/api/exam/:id",
            get(exam::get_exam).patch(exam::update_exam),
        )
        .route("/api/exam/:id/upload-file", post(exam::upload_file))
        .route("/api/exam/:id/files", get(exam::list_files))
        .route(
            "/api/exam/:id/keywords",
            get(exam::get_keywords).post(exam::save_keywords),
        )
        .route(
            "/api/exam/:id/invite-students",
            post(invitation::invite_students),
        )
        .route(
            "/api/exam/:id/invitations",
            get(invitation::list_invitations),
        )
        .route_layer(from_fn(require_faculty))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    let student_api = Router::new()
        .route(
            "/api/exam/accept-invitation",
            post(invitation::accept_invitation),
        )
        .route("/api/exam/available", get(student::available_exams))
        .route(
            "/api/exam/pending-invitations",
            get(student::pending_invitations),
        )
        .route_layer(from_fn(require_student))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health))
        .merge(faculty_api)
        .merge(student_api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
}
