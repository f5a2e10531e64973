use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::invitation::{InvitationStatus, PendingInvitation, StudentInvitation};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InviteStudentsPayload {
    #[validate(length(min = 1, max = 500, message = "provide between 1 and 500 emails"))]
    pub emails: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteOutcome {
    Created,
    AlreadyInvited,
    InvalidEmail,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteResult {
    pub email: String,
    pub code: Option<String>,
    pub outcome: InviteOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InviteResult {
    pub fn created(email: String, code: String) -> Self {
        Self {
            email,
            code: Some(code),
            outcome: InviteOutcome::Created,
            message: None,
        }
    }

    pub fn already_invited(email: String, code: String) -> Self {
        Self {
            email,
            code: Some(code),
            outcome: InviteOutcome::AlreadyInvited,
            message: None,
        }
    }

    pub fn invalid_email(email: String) -> Self {
        Self {
            email,
            code: None,
            outcome: InviteOutcome::InvalidEmail,
            message: Some("not a valid email address".to_string()),
        }
    }

    pub fn failed(email: String, message: impl Into<String>) -> Self {
        Self {
            email,
            code: None,
            outcome: InviteOutcome::Failed,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteStudentsResponse {
    pub exam_id: Uuid,
    pub results: Vec<InviteResult>,
    pub created: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AcceptInvitationPayload {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationResponse {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub status: InvitationStatus,
    pub accepted_by: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<StudentInvitation> for InvitationResponse {
    fn from(inv: StudentInvitation) -> Self {
        let status = inv.status();
        Self {
            id: inv.id,
            email: inv.email,
            code: inv.code,
            status,
            accepted_by: inv.accepted_by,
            accepted_at: inv.accepted_at,
            created_at: inv.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInvitationResponse {
    pub invitation_id: Uuid,
    pub exam_id: Uuid,
    pub exam_title: String,
    pub code: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub invited_at: DateTime<Utc>,
}

impl From<PendingInvitation> for PendingInvitationResponse {
    fn from(p: PendingInvitation) -> Self {
        Self {
            invitation_id: p.invitation_id,
            exam_id: p.exam_id,
            exam_title: p.exam_title,
            code: p.code,
            start_time: p.start_time,
            end_time: p.end_time,
            invited_at: p.invited_at,
        }
    }
}
