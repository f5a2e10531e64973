pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    exam_service::ExamService, file_store::FileStore, ingest_service::IngestService,
    invitation_service::InvitationService, keyword_service::FrequencyStrategy,
    text_extractor::TextExtractor,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub exam_service: ExamService,
    pub invitation_service: InvitationService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let file_store = FileStore::new(&config.uploads_dir, config.max_upload_bytes);
        let ingest_service = IngestService::new(
            file_store,
            TextExtractor::new(),
            Arc::new(FrequencyStrategy),
            config.keyword_top_n,
        );
        let exam_service = ExamService::new(pool.clone(), ingest_service);
        let invitation_service = InvitationService::new(pool.clone(), exam_service.clone());

        Self {
            pool,
            config,
            exam_service,
            invitation_service,
        }
    }
}
