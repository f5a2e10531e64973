use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        exam_dto::ExamSummary,
        invitation_dto::{
            AcceptInvitationPayload, InvitationResponse, InviteOutcome, InviteStudentsPayload,
            InviteStudentsResponse,
        },
    },
    error::Result,
    middleware::auth::Actor,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/exam/{id}/invite-students",
    params(
        ("id" = Uuid, Path, description = "Exam ID")
    ),
    request_body = InviteStudentsPayload,
    responses(
        (status = 200, description = "Per-address outcomes", body = Json<InviteStudentsResponse>),
        (status = 400, description = "Empty batch"),
        (status = 403, description = "Exam belongs to someone else"),
        (status = 404, description = "Exam not found")
    )
)]
#[axum::debug_handler]
pub async fn invite_students(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<InviteStudentsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let results = state
        .invitation_service
        .invite(&actor, id, payload.emails)
        .await?;
    let created = results
        .iter()
        .filter(|r| r.outcome == InviteOutcome::Created)
        .count();

    Ok(Json(InviteStudentsResponse {
        exam_id: id,
        results,
        created,
    }))
}

#[axum::debug_handler]
pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let invitations = state.invitation_service.list_for_exam(&actor, id).await?;
    Ok(Json(
        invitations
            .into_iter()
            .map(InvitationResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/exam/accept-invitation",
    request_body = AcceptInvitationPayload,
    responses(
        (status = 200, description = "Invitation accepted", body = Json<ExamSummary>),
        (status = 404, description = "Unknown code"),
        (status = 409, description = "Invitation already accepted")
    )
)]
#[axum::debug_handler]
pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<AcceptInvitationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let exam = state
        .invitation_service
        .accept(&actor, &payload.code)
        .await?;
    Ok((StatusCode::OK, Json(ExamSummary::from(exam))))
}
