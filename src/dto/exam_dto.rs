use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::exam::{Exam, ExamStatus};
use crate::models::exam_file::ExamFile;
use crate::models::exam_keyword::ExamKeyword;
use crate::services::exam_service::AttachedUpload;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateExamPayload {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(range(min = 1))]
    pub duration_minutes: i32,
    #[validate(range(min = 1))]
    pub total_marks: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateExamPayload {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 1))]
    pub total_marks: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub total_marks: i32,
    pub status: ExamStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Exam> for ExamResponse {
    fn from(exam: Exam) -> Self {
        let status = exam.status_at(Utc::now());
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            created_by: exam.created_by,
            start_time: exam.start_time,
            end_time: exam.end_time,
            duration_minutes: exam.duration_minutes,
            total_marks: exam.total_marks,
            status,
            created_at: exam.created_at,
            updated_at: exam.updated_at,
        }
    }
}

/// What a student sees: no creator or audit fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub total_marks: i32,
    pub status: ExamStatus,
}

impl From<Exam> for ExamSummary {
    fn from(exam: Exam) -> Self {
        let status = exam.status_at(Utc::now());
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            start_time: exam.start_time,
            end_time: exam.end_time,
            duration_minutes: exam.duration_minutes,
            total_marks: exam.total_marks,
            status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamFileResponse {
    pub id: Uuid,
    pub kind: String,
    pub original_filename: String,
    pub stored_path: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<ExamFile> for ExamFileResponse {
    fn from(file: ExamFile) -> Self {
        Self {
            id: file.id,
            kind: file.kind,
            original_filename: file.original_filename,
            stored_path: file.stored_path,
            uploaded_at: file.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDetailResponse {
    #[serde(flatten)]
    pub exam: ExamResponse,
    pub files: Vec<ExamFileResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct KeywordInput {
    #[validate(length(min = 1, max = 100))]
    pub keyword: String,
    #[validate(range(min = 0.0))]
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveKeywordsPayload {
    #[validate(nested)]
    pub keywords: Vec<KeywordInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordResponse {
    pub keyword: String,
    pub weight: f64,
    pub source: String,
}

impl From<ExamKeyword> for KeywordResponse {
    fn from(k: ExamKeyword) -> Self {
        Self {
            keyword: k.keyword,
            weight: k.weight,
            source: k.source,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file: ExamFileResponse,
    pub keywords: Vec<KeywordResponse>,
}

impl From<AttachedUpload> for UploadResponse {
    fn from(attached: AttachedUpload) -> Self {
        Self {
            file: ExamFileResponse::from(attached.file),
            keywords: attached
                .keywords
                .into_iter()
                .map(KeywordResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExamResponse {
    #[serde(flatten)]
    pub exam: ExamResponse,
    pub upload: Option<UploadResponse>,
}
