use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::exam_file::FileKind;
use crate::utils::token::{generate_token, FILE_TOKEN_LENGTH};

const MAX_FILENAME_LEN: usize = 120;
const MAX_NAME_ATTEMPTS: usize = 3;

/// Document formats accepted for upload and text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pdf,
    Docx,
    Txt,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileFormat::Pdf),
            "docx" => Some(FileFormat::Docx),
            "txt" => Some(FileFormat::Txt),
            _ => None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,
    pub format: FileFormat,
    pub original_filename: String,
    pub size: usize,
}

impl StoredFile {
    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
    max_bytes: usize,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Checks extension and size without touching the disk.
    pub fn validate(&self, filename: &str, len: usize) -> Result<FileFormat> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let format = FileFormat::from_extension(&ext).ok_or(Error::InvalidFileType(ext))?;

        if len > self.max_bytes {
            return Err(Error::FileTooLarge {
                size: len,
                limit: self.max_bytes,
            });
        }
        Ok(format)
    }

    /// Writes `bytes` as `{exam_id}_{kind}_{token}_{sanitized filename}`.
    /// Never overwrites an existing file.
    pub async fn store(
        &self,
        exam_id: Uuid,
        kind: FileKind,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StoredFile> {
        let format = self.validate(filename, bytes.len())?;
        let safe_name = sanitize_filename(filename);

        fs::create_dir_all(&self.root).await?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let token = generate_token(FILE_TOKEN_LENGTH);
            let path = self
                .root
                .join(format!("{}_{}_{}_{}", exam_id, kind, token, safe_name));

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::warn!("upload name clash on {:?}, retrying", path);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = write_all(&mut file, bytes).await {
                tracing::error!("Failed to write upload {:?}: {}", path, e);
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(e.into());
            }

            tracing::info!(%exam_id, kind = %kind, size = bytes.len(), "stored upload at {:?}", path);
            return Ok(StoredFile {
                path,
                format,
                original_filename: filename.to_string(),
                size: bytes.len(),
            });
        }

        Err(Error::Internal(
            "could not allocate a unique upload name".to_string(),
        ))
    }

    pub async fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
        match fs::remove_file(path.as_ref()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_all(file: &mut fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

/// Base name only, `[A-Za-z0-9._-]` kept, everything else mapped to `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return "upload".to_string();
    }
    if cleaned.len() <= MAX_FILENAME_LEN {
        return cleaned.to_string();
    }

    // Keep the extension when truncating.
    match cleaned.rfind('.') {
        Some(dot) if cleaned.len() - dot <= 10 => {
            let ext = &cleaned[dot..];
            format!("{}{}", &cleaned[..MAX_FILENAME_LEN - ext.len()], ext)
        }
        _ => cleaned[..MAX_FILENAME_LEN].to_string(),
    }
}
