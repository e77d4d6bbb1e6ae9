use crate::traits::DocumentService;
use crate::{Document, SearchResponse, SyncError, UploadFile};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs the three backend calls on behalf of a session.
///
/// Clones share the service and the cancellation token, so a clone can be
/// moved into a spawned task and still be aborted by [`RemoteSync::shutdown`].
pub struct RemoteSync<S> {
    service: Arc<S>,
    cancel: CancellationToken,
}

impl<S> Clone for RemoteSync<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cancel: self.cancel.clone(),
        }
    }
}

impl<S> RemoteSync<S> {
    /// Aborts every in-flight call made through this adapter or its clones.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<S> RemoteSync<S>
where
    S: DocumentService,
{
    pub fn new(service: S) -> Self {
        Self {
            service: Arc::new(service),
            cancel: CancellationToken::new(),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn fetch_all_documents(&self) -> Result<Vec<Document>, SyncError> {
        self.guard("list documents", self.service.list_documents()).await
    }

    /// Refuses to send anything when no file was picked.
    pub async fn upload_file(&self, file: Option<&UploadFile>) -> Result<Document, SyncError> {
        let file = file.ok_or_else(|| SyncError::InvalidInput("no file selected".to_string()))?;
        self.guard("upload", self.service.upload_file(file)).await
    }

    /// `Ok(None)` for a blank query; no request is made.
    pub async fn run_search(&self, query: &str) -> Result<Option<SearchResponse>, SyncError> {
        if query.trim().is_empty() {
            return Ok(None);
        }
        self.guard("search", self.service.search(query))
            .await
            .map(Some)
    }

    async fn guard<T, F>(&self, operation: &str, request: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, SyncError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled(operation.to_string()));
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled(operation.to_string())),
            result = request => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingService {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentService for CountingService {
        async fn list_documents(&self) -> Result<Vec<Document>, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Document::new("a.pdf", "http://x/a.pdf")])
        }

        async fn upload_file(&self, file: &UploadFile) -> Result<Document, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Document::new(file.file_name.clone(), "http://x/new"))
        }

        async fn search(&self, query: &str) -> Result<SearchResponse, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SearchResponse {
                query: Some(query.to_string()),
                response: "ok".to_string(),
                results: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn missing_file_sends_nothing() {
        let sync = RemoteSync::new(CountingService::default());
        let result = sync.upload_file(None).await;

        assert!(matches!(result, Err(SyncError::InvalidInput(_))));
        assert_eq!(sync.service().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_query_sends_nothing() -> Result<(), SyncError> {
        let sync = RemoteSync::new(CountingService::default());
        assert!(sync.run_search("  ").await?.is_none());
        assert_eq!(sync.service().calls.load(Ordering::SeqCst), 0);

        let response = sync.run_search("budget").await?;
        assert_eq!(response.and_then(|r| r.query).as_deref(), Some("budget"));
        assert_eq!(sync.service().calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn shut_down_adapter_refuses_calls() {
        let sync = RemoteSync::new(CountingService::default());
        let clone = sync.clone();
        sync.shutdown();

        assert!(clone.is_shut_down());
        let result = clone.fetch_all_documents().await;
        assert!(result.is_err_and(|err| err.is_cancelled()));
        assert_eq!(sync.service().calls.load(Ordering::SeqCst), 0);
    }
}
