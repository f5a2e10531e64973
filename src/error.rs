use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("File type .{0} is not allowed (expected pdf, docx or txt)")]
    InvalidFileType(String),

    #[error("File is {size} bytes, the limit is {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Could not read document: {0}")]
    CorruptFile(String),

    #[error("No pending invitation matches this code")]
    InvalidCode,

    #[error("This invitation has already been accepted")]
    AlreadyAccepted,

    /// Not fatal: batch invites report it as a per-address outcome.
    #[error("{email} is already invited to this exam")]
    AlreadyInvited { email: String, code: String },

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_)
            | Error::Validation(_)
            | Error::Json(_)
            | Error::InvalidFileType(_) => StatusCode::BAD_REQUEST,
            // Oversized bodies surface here as 413.
            Error::Multipart(e) => e.status(),
            Error::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::CorruptFile(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) | Error::InvalidCode => StatusCode::NOT_FOUND,
            Error::Conflict(_) | Error::AlreadyAccepted | Error::AlreadyInvited { .. } => {
                StatusCode::CONFLICT
            }
            Error::Config(_) | Error::Database(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable code sent as the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => "file_too_large",
            Error::BadRequest(_) | Error::Json(_) | Error::Multipart(_) => "bad_request",
            Error::Validation(_) => "validation_error",
            Error::InvalidFileType(_) => "invalid_file_type",
            Error::FileTooLarge { .. } => "file_too_large",
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::CorruptFile(_) => "corrupt_file",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound(_) => "not_found",
            Error::InvalidCode => "invalid_code",
            Error::Conflict(_) => "conflict",
            Error::AlreadyAccepted => "already_accepted",
            Error::AlreadyInvited { .. } => "already_invited",
            Error::Config(_) | Error::Database(_) | Error::Io(_) | Error::Internal(_) => {
                "internal_error"
            }
        }
    }

    /// Coarse cause so clients can tell bad input from missing data, permissions and conflicts.
    pub fn category(&self) -> &'static str {
        let status = self.status();
        if status == StatusCode::NOT_FOUND {
            "not_found"
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            "permission"
        } else if status == StatusCode::CONFLICT {
            "conflict"
        } else if status.is_client_error() {
            "bad_input"
        } else {
            "internal"
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": self.code(),
            "message": message,
            "category": self.category(),
        }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}

/// Name of the violated unique constraint, if `err` is one.
pub fn unique_violation(err: &sqlx::Error) -> Option<String> {
    let db_err = err.as_database_error()?;
    if db_err.is_unique_violation() {
        Some(db_err.constraint().unwrap_or_default().to_string())
    } else {
        None
    }
}

pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_foreign_key_violation())
        .unwrap_or(false)
}
