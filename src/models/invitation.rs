use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentInvitation {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub email: String,
    pub code: String,
    pub status: String,
    pub accepted_by: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentInvitation {
    pub fn status(&self) -> InvitationStatus {
        InvitationStatus::parse(&self.status)
    }
}

/// `Pending` is initial, `Accepted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
        }
    }

    fn parse(raw: &str) -> Self {
        if raw == "accepted" {
            InvitationStatus::Accepted
        } else {
            InvitationStatus::Pending
        }
    }
}

/// Invitation joined with the exam it grants access to.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingInvitation {
    pub invitation_id: Uuid,
    pub exam_id: Uuid,
    pub code: String,
    pub exam_title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub invited_at: DateTime<Utc>,
}
