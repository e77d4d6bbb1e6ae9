use crate::{Document, SearchResponse, SyncError, UploadFile};
use async_trait::async_trait;

/// The forum backend as seen by a session.
#[async_trait]
pub trait DocumentService: Send + Sync {
    async fn list_documents(&self) -> Result<Vec<Document>, SyncError>;

    async fn upload_file(&self, file: &UploadFile) -> Result<Document, SyncError>;

    async fn search(&self, query: &str) -> Result<SearchResponse, SyncError>;
}
