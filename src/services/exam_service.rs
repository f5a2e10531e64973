use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::{CreateExamPayload, KeywordInput, UpdateExamPayload};
use crate::error::{is_foreign_key_violation, Error, Result};
use crate::middleware::auth::Actor;
use crate::models::exam::Exam;
use crate::models::exam_file::{ExamFile, FileKind};
use crate::models::exam_keyword::{ExamKeyword, SOURCE_EXTRACTED, SOURCE_MANUAL};
use crate::services::ingest_service::{IngestService, StagedUpload};

/// A file part received over multipart, not yet validated.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct AttachedUpload {
    pub file: ExamFile,
    pub keywords: Vec<ExamKeyword>,
}

#[derive(Clone)]
pub struct ExamService {
    pool: PgPool,
    ingest: IngestService,
}

impl ExamService {
    pub fn new(pool: PgPool, ingest: IngestService) -> Self {
        Self { pool, ingest }
    }

    /// Creates the exam and, when given, stores and analyses its question
    /// paper. The paper is parsed before the transaction opens; the exam and
    /// its file rows then commit together.
    pub async fn create_exam(
        &self,
        actor: &Actor,
        payload: CreateExamPayload,
        question_paper: Option<UploadPart>,
    ) -> Result<(Exam, Option<AttachedUpload>)> {
        ensure_can_manage(actor)?;
        payload.validate()?;
        let title = normalize_title(&payload.title)?;
        validate_window(
            payload.start_time,
            payload.end_time,
            payload.duration_minutes,
        )?;

        let exam_id = Uuid::new_v4();
        let staged = match &question_paper {
            Some(part) => Some(
                self.ingest
                    .stage(exam_id, FileKind::QuestionPaper, &part.filename, &part.bytes)
                    .await?,
            ),
            None => None,
        };

        match self.insert_exam(actor, exam_id, &title, &payload, staged.as_ref()).await {
            Ok((exam, attached)) => {
                tracing::info!(exam_id = %exam.id, created_by = %actor.user_id, "exam created");
                Ok((exam, attached))
            }
            Err(e) => {
                if let Some(staged) = &staged {
                    self.ingest.discard(&staged.stored).await;
                }
                Err(e)
            }
        }
    }

    async fn insert_exam(
        &self,
        actor: &Actor,
        exam_id: Uuid,
        title: &str,
        payload: &CreateExamPayload,
        staged: Option<&StagedUpload>,
    ) -> Result<(Exam, Option<AttachedUpload>)> {
        let mut tx = self.pool.begin().await?;
        let exam = sqlx::query_as::<_, Exam>(
            r#"
            INSERT INTO exams (id, title, description, created_by, start_time, end_time,
                               duration_minutes, total_marks)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(exam_id)
        .bind(title)
        .bind(&payload.description)
        .bind(actor.user_id)
        .bind(payload.start_time)
        .bind(payload.end_time)
        .bind(payload.duration_minutes)
        .bind(payload.total_marks)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_actor_fk)?;

        let attached = match staged {
            Some(staged) => {
                Some(attach_in_tx(&mut tx, exam.id, FileKind::QuestionPaper, staged).await?)
            }
            None => None,
        };
        tx.commit().await?;
        Ok((exam, attached))
    }

    pub async fn get_exam(&self, id: Uuid) -> Result<Exam> {
        sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Exam {} not found", id)))
    }

    /// The exam if `actor` created it; admins may access any exam.
    pub async fn get_owned_exam(&self, actor: &Actor, id: Uuid) -> Result<Exam> {
        ensure_can_manage(actor)?;
        let exam = self.get_exam(id).await?;
        if exam.created_by != actor.user_id && !actor.is_admin() {
            tracing::warn!(exam_id = %id, actor = %actor.user_id, "exam access denied");
            return Err(Error::Forbidden(
                "You do not have permission to manage this exam".to_string(),
            ));
        }
        Ok(exam)
    }

    pub async fn update_exam(
        &self,
        actor: &Actor,
        id: Uuid,
        payload: UpdateExamPayload,
    ) -> Result<Exam> {
        payload.validate()?;
        let title = payload.title.as_deref().map(normalize_title).transpose()?;
        let current = self.get_owned_exam(actor, id).await?;

        let start_time = payload.start_time.unwrap_or(current.start_time);
        let end_time = payload.end_time.unwrap_or(current.end_time);
        let duration = payload.duration_minutes.unwrap_or(current.duration_minutes);
        validate_window(start_time, end_time, duration)?;

        let exam = sqlx::query_as::<_, Exam>(
            r#"
            UPDATE exams
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                start_time = $4,
                end_time = $5,
                duration_minutes = $6,
                total_marks = COALESCE($7, total_marks),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(&payload.description)
        .bind(start_time)
        .bind(end_time)
        .bind(duration)
        .bind(payload.total_marks)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(exam_id = %id, "exam updated");
        Ok(exam)
    }

    pub async fn list_created_by(&self, actor: &Actor) -> Result<Vec<Exam>> {
        ensure_can_manage(actor)?;
        let exams = sqlx::query_as::<_, Exam>(
            "SELECT * FROM exams WHERE created_by = $1 ORDER BY start_time DESC, created_at DESC",
        )
        .bind(actor.user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    /// Exams the student has accepted an invitation for and that have not ended.
    pub async fn list_available_for_student(&self, actor: &Actor) -> Result<Vec<Exam>> {
        let exams = sqlx::query_as::<_, Exam>(
            r#"
            SELECT DISTINCT e.*
            FROM exams e
            JOIN student_invitations si ON si.exam_id = e.id
            WHERE si.accepted_by = $1
              AND si.status = 'accepted'
              AND e.end_time > NOW()
            ORDER BY e.start_time ASC
            "#,
        )
        .bind(actor.user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    /// Stores a question paper or keyword file for an owned exam and records
    /// it together with its extracted keywords.
    pub async fn upload_file(
        &self,
        actor: &Actor,
        exam_id: Uuid,
        kind: FileKind,
        part: UploadPart,
    ) -> Result<AttachedUpload> {
        self.get_owned_exam(actor, exam_id).await?;
        let staged = self
            .ingest
            .stage(exam_id, kind, &part.filename, &part.bytes)
            .await?;

        match self.attach_upload(exam_id, kind, &staged).await {
            Ok(attached) => Ok(attached),
            Err(e) => {
                self.ingest.discard(&staged.stored).await;
                Err(e)
            }
        }
    }

    pub async fn attach_upload(
        &self,
        exam_id: Uuid,
        kind: FileKind,
        staged: &StagedUpload,
    ) -> Result<AttachedUpload> {
        let mut tx = self.pool.begin().await?;
        let attached = attach_in_tx(&mut tx, exam_id, kind, staged).await?;
        tx.commit().await?;
        Ok(attached)
    }

    pub async fn list_files(&self, actor: &Actor, exam_id: Uuid) -> Result<Vec<ExamFile>> {
        self.get_owned_exam(actor, exam_id).await?;
        self.files_for(exam_id).await
    }

    pub async fn files_for(&self, exam_id: Uuid) -> Result<Vec<ExamFile>> {
        let files = sqlx::query_as::<_, ExamFile>(
            "SELECT * FROM exam_files WHERE exam_id = $1 ORDER BY uploaded_at ASC",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    pub async fn list_keywords(&self, actor: &Actor, exam_id: Uuid) -> Result<Vec<ExamKeyword>> {
        self.get_owned_exam(actor, exam_id).await?;
        let keywords = sqlx::query_as::<_, ExamKeyword>(
            "SELECT * FROM exam_keywords WHERE exam_id = $1 ORDER BY weight DESC, keyword ASC",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(keywords)
    }

    /// Replaces every keyword of the exam with the reviewed list.
    pub async fn replace_keywords(
        &self,
        actor: &Actor,
        exam_id: Uuid,
        keywords: Vec<KeywordInput>,
    ) -> Result<Vec<ExamKeyword>> {
        self.get_owned_exam(actor, exam_id).await?;
        let keywords = normalize_keywords(keywords)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM exam_keywords WHERE exam_id = $1")
            .bind(exam_id)
            .execute(&mut *tx)
            .await?;

        let mut saved = Vec::with_capacity(keywords.len());
        for (keyword, weight) in keywords {
            let row = sqlx::query_as::<_, ExamKeyword>(
                r#"
                INSERT INTO exam_keywords (exam_id, keyword, weight, source)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(exam_id)
            .bind(keyword)
            .bind(weight)
            .bind(SOURCE_MANUAL)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }
        tx.commit().await?;

        saved.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then_with(|| a.keyword.cmp(&b.keyword))
        });
        tracing::info!(%exam_id, count = saved.len(), "keywords replaced");
        Ok(saved)
    }
}

async fn attach_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    exam_id: Uuid,
    kind: FileKind,
    staged: &StagedUpload,
) -> Result<AttachedUpload> {
    let file = sqlx::query_as::<_, ExamFile>(
        r#"
        INSERT INTO exam_files (exam_id, kind, stored_path, original_filename)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(exam_id)
    .bind(kind.as_str())
    .bind(staged.stored.path_string())
    .bind(&staged.stored.original_filename)
    .fetch_one(&mut **tx)
    .await?;

    // Extraction never overwrites a keyword a reviewer saved by hand.
    let mut keywords = Vec::with_capacity(staged.keywords.len());
    for ranked in &staged.keywords {
        let row = sqlx::query_as::<_, ExamKeyword>(
            r#"
            INSERT INTO exam_keywords (exam_id, keyword, weight, source)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT exam_keywords_exam_keyword_key DO UPDATE
            SET weight = EXCLUDED.weight,
                updated_at = NOW()
            WHERE exam_keywords.source = $4
            RETURNING *
            "#,
        )
        .bind(exam_id)
        .bind(&ranked.word)
        .bind(ranked.weight())
        .bind(SOURCE_EXTRACTED)
        .fetch_optional(&mut **tx)
        .await?;
        keywords.extend(row);
    }

    tracing::info!(
        %exam_id,
        file_id = %file.id,
        keywords = keywords.len(),
        "upload attached"
    );
    Ok(AttachedUpload { file, keywords })
}

fn ensure_can_manage(actor: &Actor) -> Result<()> {
    if actor.can_manage_exams() {
        Ok(())
    } else {
        Err(Error::Forbidden(
            "Only faculty can manage exams".to_string(),
        ))
    }
}

fn map_actor_fk(err: sqlx::Error) -> Error {
    if is_foreign_key_violation(&err) {
        Error::Forbidden("Unknown user".to_string())
    } else {
        err.into()
    }
}

/// Titles are stored trimmed and must keep at least one character.
fn normalize_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::BadRequest("title must not be blank".to_string()));
    }
    Ok(title.to_string())
}

/// `end > start`, and the duration must fit inside the window.
pub fn validate_window(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_minutes: i32,
) -> Result<()> {
    if end_time <= start_time {
        return Err(Error::BadRequest(
            "end_time must be after start_time".to_string(),
        ));
    }
    if duration_minutes <= 0 {
        return Err(Error::BadRequest(
            "duration_minutes must be positive".to_string(),
        ));
    }
    let window = (end_time - start_time).num_minutes();
    if i64::from(duration_minutes) > window {
        return Err(Error::BadRequest(format!(
            "duration of {} minutes does not fit the {} minute window",
            duration_minutes, window
        )));
    }
    Ok(())
}

/// Trims and lowercases; later duplicates are dropped.
fn normalize_keywords(input: Vec<KeywordInput>) -> Result<Vec<(String, f64)>> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(input.len());
    for item in input {
        let keyword = item.keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return Err(Error::BadRequest("keyword must not be blank".to_string()));
        }
        if !item.weight.is_finite() || item.weight < 0.0 {
            return Err(Error::BadRequest(format!(
                "weight for '{}' must be a non-negative number",
                keyword
            )));
        }
        if seen.insert(keyword.clone()) {
            out.push((keyword, item.weight));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::Duration;

    #[test]
    fn window_must_be_ordered() {
        let now = Utc::now();
        assert!(matches!(
            validate_window(now, now, 10),
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            validate_window(now, now - Duration::minutes(5), 10),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn duration_must_fit_window() {
        let start = Utc::now();
        let end = start + Duration::minutes(90);
        assert!(validate_window(start, end, 90).is_ok());
        assert!(validate_window(start, end, 91).is_err());
        assert!(validate_window(start, end, 0).is_err());
    }

    #[test]
    fn blank_titles_are_rejected_after_trimming() {
        assert_eq!(normalize_title("  Algebra I ").unwrap(), "Algebra I");
        for blank in ["", "   ", "\t\n"] {
            assert!(matches!(normalize_title(blank), Err(Error::BadRequest(_))));
        }
    }

    #[test]
    fn keywords_are_normalized_and_deduplicated() {
        let out = normalize_keywords(vec![
            KeywordInput { keyword: "  Ohm ".into(), weight: 2.0 },
            KeywordInput { keyword: "ohm".into(), weight: 9.0 },
            KeywordInput { keyword: "Volt".into(), weight: 0.0 },
        ])
        .unwrap();
        assert_eq!(out, vec![("ohm".to_string(), 2.0), ("volt".to_string(), 0.0)]);
    }

    #[test]
    fn blank_keyword_is_rejected() {
        let result = normalize_keywords(vec![KeywordInput {
            keyword: "   ".into(),
            weight: 1.0,
        }]);
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn students_cannot_manage_exams() {
        let student = Actor {
            user_id: Uuid::new_v4(),
            role: Role::Student,
            email: None,
        };
        assert!(matches!(ensure_can_manage(&student), Err(Error::Forbidden(_))));

        let admin = Actor {
            role: Role::Admin,
            ..student
        };
        assert!(ensure_can_manage(&admin).is_ok());
    }
}
