use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamFile {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub kind: String,
    pub stored_path: String,
    pub original_filename: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    QuestionPaper,
    Keywords,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::QuestionPaper => "question_paper",
            FileKind::Keywords => "keywords",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "question_paper" => Some(FileKind::QuestionPaper),
            "keywords" => Some(FileKind::Keywords),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
