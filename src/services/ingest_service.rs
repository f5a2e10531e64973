use std::sync::Arc;

use uuid::Uuid;

use crate::error::Result;
use crate::models::exam_file::FileKind;
use crate::services::file_store::{FileStore, StoredFile};
use crate::services::keyword_service::{KeywordStrategy, RankedKeyword};
use crate::services::text_extractor::TextExtractor;

/// An upload that is on disk and analysed but not yet recorded in the database.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub stored: StoredFile,
    pub keywords: Vec<RankedKeyword>,
}

/// Store, extract, rank. Owns no database state.
#[derive(Clone)]
pub struct IngestService {
    file_store: FileStore,
    extractor: TextExtractor,
    strategy: Arc<dyn KeywordStrategy>,
    top_n: usize,
}

impl IngestService {
    pub fn new(
        file_store: FileStore,
        extractor: TextExtractor,
        strategy: Arc<dyn KeywordStrategy>,
        top_n: usize,
    ) -> Self {
        Self {
            file_store,
            extractor,
            strategy,
            top_n,
        }
    }

    pub fn file_store(&self) -> &FileStore {
        &self.file_store
    }

    /// Writes the upload and extracts keywords from it. If extraction fails
    /// the stored file is removed before the error is returned.
    pub async fn stage(
        &self,
        exam_id: Uuid,
        kind: FileKind,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StagedUpload> {
        let stored = self.file_store.store(exam_id, kind, filename, bytes).await?;

        let text = match self.extractor.extract(bytes.to_vec(), stored.format).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%exam_id, "text extraction failed for {}: {}", filename, e);
                self.discard(&stored).await;
                return Err(e);
            }
        };

        let keywords = self.strategy.extract(&text, self.top_n);
        tracing::info!(
            %exam_id,
            kind = %kind,
            strategy = self.strategy.name(),
            keywords = keywords.len(),
            "upload staged"
        );
        Ok(StagedUpload { stored, keywords })
    }

    /// Best-effort removal of a staged file whose database write failed.
    pub async fn discard(&self, stored: &StoredFile) {
        if let Err(e) = self.file_store.remove(&stored.path).await {
            tracing::error!("Failed to remove staged upload {:?}: {}", stored.path, e);
        }
    }
}
