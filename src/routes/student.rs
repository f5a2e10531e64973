use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::{exam_dto::ExamSummary, invitation_dto::PendingInvitationResponse},
    error::Result,
    middleware::auth::Actor,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/exam/available",
    responses(
        (status = 200, description = "Accepted exams that have not ended", body = [ExamSummary]),
        (status = 403, description = "Caller is not a student")
    )
)]
#[axum::debug_handler]
pub async fn available_exams(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let exams = state
        .exam_service
        .list_available_for_student(&actor)
        .await?;
    Ok(Json(
        exams.into_iter().map(ExamSummary::from).collect::<Vec<_>>(),
    ))
}

#[axum::debug_handler]
pub async fn pending_invitations(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let pending = state.invitation_service.pending_for_student(&actor).await?;
    Ok(Json(
        pending
            .into_iter()
            .map(PendingInvitationResponse::from)
            .collect::<Vec<_>>(),
    ))
}
