use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::invitation_dto::{InviteOutcome, InviteResult};
use crate::error::{is_foreign_key_violation, unique_violation, Error, Result};
use crate::middleware::auth::Actor;
use crate::models::exam::Exam;
use crate::models::invitation::{InvitationStatus, PendingInvitation, StudentInvitation};
use crate::models::user::Role;
use crate::services::exam_service::ExamService;
use crate::utils::token::generate_invitation_code;
use crate::utils::validation::{dedup_preserving_order, normalize_email};

const MAX_CODE_ATTEMPTS: usize = 5;
const CODE_CONSTRAINT: &str = "student_invitations_code_key";

#[derive(Clone)]
pub struct InvitationService {
    pool: PgPool,
    exams: ExamService,
}

impl InvitationService {
    pub fn new(pool: PgPool, exams: ExamService) -> Self {
        Self { pool, exams }
    }

    /// Invites every address in `emails` to the exam. Each address gets its
    /// own outcome; one failure never aborts the rest of the batch.
    pub async fn invite(
        &self,
        actor: &Actor,
        exam_id: Uuid,
        emails: Vec<String>,
    ) -> Result<Vec<InviteResult>> {
        self.exams.get_owned_exam(actor, exam_id).await?;

        let emails = dedup_preserving_order(
            emails
                .into_iter()
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty()),
        );
        if emails.is_empty() {
            return Err(Error::BadRequest(
                "At least one email address is required".to_string(),
            ));
        }

        let mut results = Vec::with_capacity(emails.len());
        for raw in emails {
            let Some(email) = normalize_email(&raw) else {
                tracing::warn!(%exam_id, "skipping malformed invitee address {}", raw);
                results.push(InviteResult::invalid_email(raw));
                continue;
            };
            let result = match self.invite_one(exam_id, &email).await {
                Ok(invitation) => InviteResult::created(invitation.email, invitation.code),
                Err(Error::AlreadyInvited { email, code }) => {
                    InviteResult::already_invited(email, code)
                }
                Err(e) => {
                    tracing::error!(%exam_id, "Failed to invite {}: {}", email, e);
                    InviteResult::failed(email, "could not create invitation")
                }
            };
            results.push(result);
        }

        let created = results
            .iter()
            .filter(|r| r.outcome == InviteOutcome::Created)
            .count();
        tracing::info!(%exam_id, created, total = results.len(), "invitations processed");
        Ok(results)
    }

    /// Creates one pending invitation, or reports the existing one as
    /// `Error::AlreadyInvited`.
    async fn invite_one(&self, exam_id: Uuid, email: &str) -> Result<StudentInvitation> {
        if let Some(existing) = self.find_by_exam_email(exam_id, email).await? {
            return Err(already_invited(existing));
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_invitation_code();
            if self.code_taken(exam_id, &code).await? {
                tracing::warn!(%exam_id, attempt, "invitation code collision, regenerating");
                continue;
            }

            let inserted = sqlx::query_as::<_, StudentInvitation>(
                r#"
                INSERT INTO student_invitations (exam_id, email, code)
                VALUES ($1, $2, $3)
                ON CONFLICT ON CONSTRAINT student_invitations_exam_email_key DO NOTHING
                RETURNING *
                "#,
            )
            .bind(exam_id)
            .bind(email)
            .bind(&code)
            .fetch_optional(&self.pool)
            .await;

            match inserted {
                Ok(Some(invitation)) => return Ok(invitation),
                // Another request invited the same address first.
                Ok(None) => {
                    let existing = self
                        .find_by_exam_email(exam_id, email)
                        .await?
                        .ok_or_else(|| {
                            Error::Internal("invitation vanished after conflict".to_string())
                        })?;
                    return Err(already_invited(existing));
                }
                Err(e) if unique_violation(&e).as_deref() == Some(CODE_CONSTRAINT) => {
                    tracing::warn!(%exam_id, attempt, "global code collision, regenerating");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::Conflict(
            "could not allocate a unique invitation code".to_string(),
        ))
    }

    async fn find_by_exam_email(
        &self,
        exam_id: Uuid,
        email: &str,
    ) -> Result<Option<StudentInvitation>> {
        let invitation = sqlx::query_as::<_, StudentInvitation>(
            "SELECT * FROM student_invitations WHERE exam_id = $1 AND email = $2",
        )
        .bind(exam_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invitation)
    }

    async fn code_taken(&self, exam_id: Uuid, code: &str) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM student_invitations WHERE exam_id = $1 AND code = $2)",
        )
        .bind(exam_id)
        .bind(code)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    /// Flips a pending invitation to accepted. Concurrent calls with the same
    /// code race on the conditional update; exactly one wins.
    pub async fn accept(&self, actor: &Actor, code: &str) -> Result<Exam> {
        if actor.role != Role::Student {
            return Err(Error::Forbidden(
                "Only students can accept invitations".to_string(),
            ));
        }
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::InvalidCode);
        }

        let accepted = sqlx::query_as::<_, StudentInvitation>(
            r#"
            UPDATE student_invitations
            SET status = 'accepted',
                accepted_by = $2,
                accepted_at = NOW(),
                updated_at = NOW()
            WHERE code = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(actor.user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                Error::Forbidden("Unknown user".to_string())
            } else {
                e.into()
            }
        })?;

        let Some(invitation) = accepted else {
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM student_invitations WHERE code = $1")
                    .bind(code)
                    .fetch_optional(&self.pool)
                    .await?;
            return match status.as_deref() {
                Some(s) if s == InvitationStatus::Accepted.as_str() => Err(Error::AlreadyAccepted),
                _ => {
                    tracing::warn!(student = %actor.user_id, "invalid invitation code presented");
                    Err(Error::InvalidCode)
                }
            };
        };

        tracing::info!(
            exam_id = %invitation.exam_id,
            student = %actor.user_id,
            "invitation accepted"
        );
        self.exams.get_exam(invitation.exam_id).await
    }

    pub async fn list_for_exam(
        &self,
        actor: &Actor,
        exam_id: Uuid,
    ) -> Result<Vec<StudentInvitation>> {
        self.exams.get_owned_exam(actor, exam_id).await?;
        let invitations = sqlx::query_as::<_, StudentInvitation>(
            "SELECT * FROM student_invitations WHERE exam_id = $1 ORDER BY created_at ASC, email ASC",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invitations)
    }

    /// Unaccepted invitations addressed to the student's email.
    pub async fn pending_for_student(&self, actor: &Actor) -> Result<Vec<PendingInvitation>> {
        let Some(email) = actor.email.as_deref() else {
            return Ok(Vec::new());
        };
        let pending = sqlx::query_as::<_, PendingInvitation>(
            r#"
            SELECT si.id AS invitation_id,
                   si.exam_id,
                   si.code,
                   e.title AS exam_title,
                   e.start_time,
                   e.end_time,
                   si.created_at AS invited_at
            FROM student_invitations si
            JOIN exams e ON e.id = si.exam_id
            WHERE si.email = $1
              AND si.status = 'pending'
              AND e.end_time > NOW()
            ORDER BY e.start_time ASC
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(pending)
    }
}

fn already_invited(existing: StudentInvitation) -> Error {
    Error::AlreadyInvited {
        email: existing.email,
        code: existing.code,
    }
}
