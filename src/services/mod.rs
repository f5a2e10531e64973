pub mod exam_service;
pub mod file_store;
pub mod ingest_service;
pub mod invitation_service;
pub mod keyword_service;
pub mod text_extractor;
