use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// `weight` is opaque metadata: the raw occurrence count for extracted
/// keywords, whatever faculty entered for manual ones.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamKeyword {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub keyword: String,
    pub weight: f64,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const SOURCE_EXTRACTED: &str = "extracted";
pub const SOURCE_MANUAL: &str = "manual";
