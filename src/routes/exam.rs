use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::exam_dto::{
        CreateExamPayload, CreateExamResponse, ExamDetailResponse, ExamFileResponse,
        ExamResponse, KeywordResponse, SaveKeywordsPayload, UpdateExamPayload, UploadResponse,
    },
    error::{Error, Result},
    middleware::auth::Actor,
    models::exam_file::FileKind,
    services::exam_service::UploadPart,
    AppState,
};

async fn read_text(field: Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| Error::BadRequest(format!("Could not read field '{}': {}", name, e)))
}

async fn read_file(field: Field<'_>) -> Result<Option<UploadPart>> {
    let filename = field.file_name().unwrap_or("").to_string();
    let bytes = field.bytes().await.map_err(|e| {
        tracing::error!("Failed to read upload bytes: {}", e);
        Error::BadRequest("Failed to read file upload".into())
    })?;
    if filename.is_empty() && bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(UploadPart { filename, bytes }))
}

fn parse_time(raw: &str, name: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| Error::BadRequest(format!("{} must be an RFC 3339 timestamp", name)))
}

fn parse_int(raw: &str, name: &str) -> Result<i32> {
    raw.trim()
        .parse()
        .map_err(|_| Error::BadRequest(format!("{} must be an integer", name)))
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| Error::BadRequest(format!("{} is required", name)))
}

/// Multipart form: exam fields as text parts plus an optional
/// `question_paper` file part.
#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut title = None;
    let mut description = None;
    let mut start_time = None;
    let mut end_time = None;
    let mut duration_minutes = None;
    let mut total_marks = None;
    let mut question_paper = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "title" => title = Some(read_text(field, "title").await?),
            "description" => {
                let text = read_text(field, "description").await?;
                if !text.trim().is_empty() {
                    description = Some(text);
                }
            }
            "start_time" => {
                start_time = Some(parse_time(&read_text(field, "start_time").await?, "start_time")?)
            }
            "end_time" => {
                end_time = Some(parse_time(&read_text(field, "end_time").await?, "end_time")?)
            }
            "duration_minutes" => {
                duration_minutes = Some(parse_int(
                    &read_text(field, "duration_minutes").await?,
                    "duration_minutes",
                )?)
            }
            "total_marks" => {
                total_marks = Some(parse_int(&read_text(field, "total_marks").await?, "total_marks")?)
            }
            "question_paper" => question_paper = read_file(field).await?,
            other => tracing::debug!("ignoring multipart field {}", other),
        }
    }

    let payload = CreateExamPayload {
        title: required(title, "title")?,
        description,
        start_time: required(start_time, "start_time")?,
        end_time: required(end_time, "end_time")?,
        duration_minutes: required(duration_minutes, "duration_minutes")?,
        total_marks: required(total_marks, "total_marks")?,
    };
    payload.validate()?;

    let (exam, upload) = state
        .exam_service
        .create_exam(&actor, payload, question_paper)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateExamResponse {
            exam: ExamResponse::from(exam),
            upload: upload.map(UploadResponse::from),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/exam/mine",
    responses(
        (status = 200, description = "Exams created by the caller", body = [ExamResponse]),
        (status = 403, description = "Caller is not faculty")
    )
)]
#[axum::debug_handler]
pub async fn list_my_exams(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse> {
    let exams = state.exam_service.list_created_by(&actor).await?;
    Ok(Json(
        exams.into_iter().map(ExamResponse::from).collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/exam/{id}",
    params(
        ("id" = Uuid, Path, description = "Exam ID")
    ),
    responses(
        (status = 200, description = "Exam with its uploaded files", body = Json<ExamDetailResponse>),
        (status = 403, description = "Exam belongs to someone else"),
        (status = 404, description = "Exam not found")
    )
)]
#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let exam = state.exam_service.get_owned_exam(&actor, id).await?;
    let files = state.exam_service.files_for(id).await?;
    Ok(Json(ExamDetailResponse {
        exam: ExamResponse::from(exam),
        files: files.into_iter().map(ExamFileResponse::from).collect(),
    }))
}

#[utoipa::path(
    patch,
    path = "/api/exam/{id}",
    params(
        ("id" = Uuid, Path, description = "Exam ID")
    ),
    request_body = UpdateExamPayload,
    responses(
        (status = 200, description = "Exam updated", body = Json<ExamResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Exam not found")
    )
)]
#[axum::debug_handler]
pub async fn update_exam(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExamPayload>,
) -> Result<impl IntoResponse> {
    let exam = state.exam_service.update_exam(&actor, id, payload).await?;
    Ok(Json(ExamResponse::from(exam)))
}

/// Multipart form with a `kind` text part (`question_paper` or `keywords`)
/// and a `file` part.
#[axum::debug_handler]
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut kind = None;
    let mut part = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "kind" | "file_type" => {
                let raw = read_text(field, "kind").await?;
                kind = Some(FileKind::parse(&raw).ok_or_else(|| {
                    Error::BadRequest(format!(
                        "kind must be question_paper or keywords, got '{}'",
                        raw
                    ))
                })?);
            }
            "file" => part = read_file(field).await?,
            _ => {}
        }
    }

    let kind = required(kind, "kind")?;
    let part = required(part, "file")?;
    let attached = state
        .exam_service
        .upload_file(&actor, id, kind, part)
        .await?;

    Ok((StatusCode::CREATED, Json(UploadResponse::from(attached))))
}

#[axum::debug_handler]
pub async fn list_files(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let files = state.exam_service.list_files(&actor, id).await?;
    Ok(Json(
        files
            .into_iter()
            .map(ExamFileResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/exam/{id}/keywords",
    params(
        ("id" = Uuid, Path, description = "Exam ID")
    ),
    request_body = SaveKeywordsPayload,
    responses(
        (status = 200, description = "Keywords replaced", body = [KeywordResponse]),
        (status = 400, description = "Invalid keyword list"),
        (status = 403, description = "Exam belongs to someone else")
    )
)]
#[axum::debug_handler]
pub async fn save_keywords(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SaveKeywordsPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let saved = state
        .exam_service
        .replace_keywords(&actor, id, payload.keywords)
        .await?;
    Ok(Json(
        saved
            .into_iter()
            .map(KeywordResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[axum::debug_handler]
pub async fn get_keywords(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let keywords = state.exam_service.list_keywords(&actor, id).await?;
    Ok(Json(
        keywords
            .into_iter()
            .map(KeywordResponse::from)
            .collect::<Vec<_>>(),
    ))
}
