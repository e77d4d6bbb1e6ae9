//! One user's session against the forum backend.
//!
//! Calls can be awaited in place (`refresh_documents`, `upload`, `search`) or
//! spawned (`spawn_*`). Spawned calls report back through a channel and are
//! applied by `next_event`/`drain_events` in arrival order, so the store is
//! only ever touched from the task that owns the session.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::OpenError;
use crate::store::{Action, Operation, SearchOrdering, SearchTicket, SessionStore};
use crate::sync::RemoteSync;
use crate::traits::DocumentService;
use crate::view::{open_document, select_view, DocumentOpener, View};
use crate::{Document, SearchResponse, SyncError, UploadFile};

pub struct ForumSession<S> {
    store: SessionStore,
    sync: RemoteSync<S>,
    events_tx: mpsc::UnboundedSender<Action>,
    events_rx: mpsc::UnboundedReceiver<Action>,
}

impl<S> ForumSession<S>
where
    S: DocumentService + 'static,
{
    pub fn new(service: S, ordering: SearchOrdering) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            store: SessionStore::new(ordering),
            sync: RemoteSync::new(service),
            events_tx,
            events_rx,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn sync(&self) -> &RemoteSync<S> {
        &self.sync
    }

    pub fn view(&self) -> View<'_> {
        select_view(&self.store)
    }

    pub fn add_text_entry(&mut self, text: impl Into<String>) -> bool {
        self.store.add_text_entry(text)
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.store.set_search_query(query);
    }

    pub fn clear_search_query(&mut self) {
        self.store.clear_search_query();
    }

    /// Fetches the full document list.
    ///
    /// Like `upload` and `search`, returns whether session data changed. A
    /// failure only records a notice and returns `false`.
    pub async fn refresh_documents(&mut self) -> bool {
        let result = self.sync.fetch_all_documents().await;
        self.settle(settle_listing(result))
    }

    pub async fn upload(&mut self, file: Option<UploadFile>) -> bool {
        let result = self.sync.upload_file(file.as_ref()).await;
        self.settle(settle_upload(result))
    }

    /// Sets the query box to `query` and submits it. A blank query leaves
    /// the query box alone.
    pub async fn search(&mut self, query: impl Into<String>) -> bool {
        let query = query.into();
        if query.trim().is_empty() {
            return false;
        }
        self.store.set_search_query(query);
        self.submit_search().await
    }

    /// Submits whatever is in the query box. Blank queries do nothing.
    pub async fn submit_search(&mut self) -> bool {
        let query = self.store.search_query().to_string();
        if query.trim().is_empty() {
            return false;
        }

        let ticket = self.store.issue_search_ticket();
        let result = self.sync.run_search(&query).await;
        self.settle(settle_search(ticket, result))
    }

    pub fn spawn_refresh_documents(&self) -> JoinHandle<()> {
        let sync = self.sync.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = sync.fetch_all_documents().await;
            forward(&events, settle_listing(result));
        })
    }

    pub fn spawn_upload(&self, file: Option<UploadFile>) -> JoinHandle<()> {
        let sync = self.sync.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = sync.upload_file(file.as_ref()).await;
            forward(&events, settle_upload(result));
        })
    }

    /// `None` when the query is blank and nothing was sent.
    pub fn spawn_search(&mut self, query: impl Into<String>) -> Option<JoinHandle<()>> {
        let query = query.into();
        if query.trim().is_empty() {
            return None;
        }
        self.store.set_search_query(query.clone());

        let ticket = self.store.issue_search_ticket();
        let sync = self.sync.clone();
        let events = self.events_tx.clone();
        Some(tokio::spawn(async move {
            let result = sync.run_search(&query).await;
            forward(&events, settle_search(ticket, result));
        }))
    }

    /// Waits for the next spawned result and applies it. The flag is whether
    /// session data changed. `None` once the session is shut down.
    pub async fn next_event(&mut self) -> Option<bool> {
        if self.sync.is_shut_down() {
            return None;
        }
        let action = self.events_rx.recv().await?;
        Some(self.apply_event(action))
    }

    /// Applies every spawned result that has already arrived.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(action) = self.events_rx.try_recv() {
            if self.apply_event(action) {
                applied += 1;
            }
        }
        applied
    }

    /// Opens the `index`-th document of the current view.
    pub async fn open_document<O>(&self, index: usize, opener: &O) -> Result<(), OpenError>
    where
        O: DocumentOpener + ?Sized,
    {
        let url = self.view().document(index).and_then(Document::url);
        open_document(url, opener).await
    }

    /// Aborts in-flight calls. Results that arrive afterwards are dropped.
    pub fn shutdown(&mut self) {
        self.sync.shutdown();
        self.events_rx.close();
        while self.events_rx.try_recv().is_ok() {}
        info!("session shut down");
    }

    fn apply_event(&mut self, action: Action) -> bool {
        if self.sync.is_shut_down() {
            debug!("dropping result that arrived after shutdown");
            return false;
        }
        self.store.apply(action)
    }

    fn settle(&mut self, action: Option<Action>) -> bool {
        match action {
            Some(action) => self.apply_event(action),
            None => false,
        }
    }
}

impl<S> Drop for ForumSession<S> {
    fn drop(&mut self) {
        self.sync.shutdown();
    }
}

fn forward(events: &mpsc::UnboundedSender<Action>, action: Option<Action>) {
    if let Some(action) = action {
        if events.send(action).is_err() {
            debug!("session gone, dropping result");
        }
    }
}

fn settle_listing(result: Result<Vec<Document>, SyncError>) -> Option<Action> {
    match result {
        Ok(documents) => {
            info!(count = documents.len(), "documents received");
            Some(Action::DocumentsLoaded(documents))
        }
        Err(err) => failure(Operation::ListDocuments, None, err),
    }
}

fn settle_upload(result: Result<Document, SyncError>) -> Option<Action> {
    match result {
        Ok(document) => {
            info!(file_name = %document.file_name, "file uploaded");
            Some(Action::DocumentUploaded(document))
        }
        Err(err) => failure(Operation::Upload, None, err),
    }
}

fn settle_search(
    ticket: SearchTicket,
    result: Result<Option<SearchResponse>, SyncError>,
) -> Option<Action> {
    match result {
        Ok(Some(response)) => {
            info!(
                ticket = ticket.value(),
                results = response.results.len(),
                "search results received"
            );
            Some(Action::SearchCompleted { ticket, response })
        }
        Ok(None) => None,
        Err(err) => failure(Operation::Search, Some(ticket), err),
    }
}

fn failure(
    operation: Operation,
    ticket: Option<SearchTicket>,
    err: SyncError,
) -> Option<Action> {
    if err.is_cancelled() {
        debug!(%operation, "request cancelled");
        return None;
    }
    warn!(%operation, error = %err, "request failed");
    Some(Action::RequestFailed {
        operation,
        message: err.to_string(),
        ticket,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewState;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;
    use url::Url;

    #[derive(Default)]
    struct FakeService {
        listing: Vec<Document>,
        searches: HashMap<String, SearchResponse>,
        gates: HashMap<String, Arc<Notify>>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeService {
        fn gate(&mut self, query: &str) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            self.gates.insert(query.to_string(), Arc::clone(&notify));
            notify
        }
    }

    #[async_trait]
    impl DocumentService for FakeService {
        async fn list_documents(&self) -> Result<Vec<Document>, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SyncError::BackendResponse {
                    endpoint: "files".to_string(),
                    details: "500 Internal Server Error".to_string(),
                });
            }
            Ok(self.listing.clone())
        }

        async fn upload_file(&self, file: &UploadFile) -> Result<Document, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SyncError::BackendResponse {
                    endpoint: "upload".to_string(),
                    details: "413 Payload Too Large".to_string(),
                });
            }
            Ok(Document::new(
                file.file_name.clone(),
                format!("http://x/{}", file.file_name),
            ))
        }

        async fn search(&self, query: &str) -> Result<SearchResponse, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = self.gates.get(query) {
                gate.notified().await;
            }
            if self.fail {
                return Err(SyncError::BackendResponse {
                    endpoint: "search".to_string(),
                    details: "502 Bad Gateway".to_string(),
                });
            }
            Ok(self.searches.get(query).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct RecordingOpener {
        opened: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentOpener for RecordingOpener {
        async fn open(&self, url: &Url) -> Result<(), OpenError> {
            self.opened
                .lock()
                .map_err(|err| OpenError::Launch(err.to_string()))?
                .push(url.to_string());
            Ok(())
        }
    }

    fn doc(name: &str) -> Document {
        Document::new(name, format!("http://x/{name}"))
    }

    fn found(summary: &str, results: Vec<Document>) -> SearchResponse {
        SearchResponse {
            query: None,
            response: summary.to_string(),
            results,
        }
    }

    #[tokio::test]
    async fn startup_listing_then_text_entry_shows_both() {
        let service = FakeService {
            listing: vec![doc("a.pdf")],
            ..FakeService::default()
        };
        let mut session = ForumSession::new(service, SearchOrdering::default());

        assert!(session.refresh_documents().await);
        assert_eq!(session.store().documents(), &[doc("a.pdf")]);

        session.add_text_entry("hello");
        let view = session.view();
        assert_eq!(view.state, ViewState::AllDocuments);
        assert_eq!(view.documents, &[doc("a.pdf")]);
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].as_str(), "hello");
    }

    #[tokio::test]
    async fn search_hides_documents_and_entries() {
        let mut searches = HashMap::new();
        searches.insert("budget".to_string(), found("Found 1 match", vec![doc("b.pdf")]));
        let service = FakeService {
            listing: vec![doc("a.pdf")],
            searches,
            ..FakeService::default()
        };
        let mut session = ForumSession::new(service, SearchOrdering::default());
        session.refresh_documents().await;
        session.add_text_entry("hello");

        assert!(session.search("budget").await);

        let view = session.view();
        assert_eq!(view.state, ViewState::SearchResults);
        assert_eq!(view.summary, "Found 1 match");
        assert_eq!(view.documents, &[doc("b.pdf")]);
        assert!(view.entries.is_empty());
    }

    #[tokio::test]
    async fn blank_search_is_a_no_op() {
        let mut session = ForumSession::new(FakeService::default(), SearchOrdering::default());
        session.store.set_search(vec![doc("kept.pdf")], "earlier");
        session.set_search_query("budget");

        assert!(!session.search("   ").await);
        assert!(session.spawn_search("").is_none());
        assert_eq!(session.store().search_query(), "budget");
        assert_eq!(session.store().search().summary, "earlier");
        assert_eq!(session.sync().service().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upload_without_file_sends_nothing() {
        let service = FakeService {
            listing: vec![doc("a.pdf")],
            ..FakeService::default()
        };
        let mut session = ForumSession::new(service, SearchOrdering::default());
        session.refresh_documents().await;

        assert!(!session.upload(None).await);
        assert_eq!(session.store().documents(), &[doc("a.pdf")]);
        assert_eq!(session.sync().service().calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            session.store().notice().map(|notice| notice.operation),
            Some(Operation::Upload)
        );
    }

    #[tokio::test]
    async fn upload_appends_returned_descriptor() {
        let mut session = ForumSession::new(FakeService::default(), SearchOrdering::default());
        let file = UploadFile::new("minutes.docx", b"PK\x03\x04".to_vec());

        assert!(session.upload(Some(file)).await);
        assert_eq!(session.store().documents(), &[doc("minutes.docx")]);
    }

    #[tokio::test]
    async fn failures_leave_prior_state_untouched() {
        let failing = FakeService {
            fail: true,
            ..FakeService::default()
        };
        let mut failing_session = ForumSession::new(failing, SearchOrdering::default());
        failing_session.store.set_documents(vec![doc("a.pdf")]);
        failing_session.store.set_search(vec![doc("b.pdf")], "earlier");

        failing_session.refresh_documents().await;
        failing_session
            .upload(Some(UploadFile::new("c.pdf", Vec::new())))
            .await;
        failing_session.search("anything").await;

        let store = failing_session.store();
        assert_eq!(store.documents(), &[doc("a.pdf")]);
        assert_eq!(store.search().results, vec![doc("b.pdf")]);
        assert_eq!(store.search().summary, "earlier");
        assert_eq!(
            store.notice().map(|notice| notice.operation),
            Some(Operation::Search)
        );
    }

    #[tokio::test]
    async fn out_of_order_responses_follow_ordering_policy() -> Result<(), Box<dyn std::error::Error>>
    {
        for (ordering, expected) in [
            (SearchOrdering::LastWriteWins, "old summary"),
            (SearchOrdering::LatestIssued, "new summary"),
        ] {
            let mut service = FakeService::default();
            service
                .searches
                .insert("old".to_string(), found("old summary", vec![doc("o.pdf")]));
            service
                .searches
                .insert("new".to_string(), found("new summary", vec![doc("n.pdf")]));
            let old_gate = service.gate("old");
            let new_gate = service.gate("new");

            let mut session = ForumSession::new(service, ordering);
            let old = session.spawn_search("old").ok_or("old search not sent")?;
            let new = session.spawn_search("new").ok_or("new search not sent")?;

            new_gate.notify_one();
            new.await?;
            assert_eq!(session.next_event().await, Some(true));

            old_gate.notify_one();
            old.await?;
            session.next_event().await;

            assert_eq!(session.store().search().summary, expected);
        }
        Ok(())
    }

    #[tokio::test]
    async fn spawned_calls_are_applied_when_drained() -> Result<(), Box<dyn std::error::Error>> {
        let service = FakeService {
            listing: vec![doc("a.pdf"), doc("b.pdf")],
            ..FakeService::default()
        };
        let mut session = ForumSession::new(service, SearchOrdering::default());

        let listing = session.spawn_refresh_documents();
        let upload = session.spawn_upload(Some(UploadFile::new("c.pdf", Vec::new())));
        listing.await?;
        upload.await?;

        assert_eq!(session.drain_events(), 2);
        assert_eq!(session.store().documents().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_drops_in_flight_results() -> Result<(), Box<dyn std::error::Error>> {
        let mut service = FakeService::default();
        service
            .searches
            .insert("late".to_string(), found("late", vec![doc("late.pdf")]));
        let gate = service.gate("late");

        let mut session = ForumSession::new(service, SearchOrdering::default());
        let handle = session.spawn_search("late").ok_or("search not sent")?;

        session.shutdown();
        gate.notify_one();
        handle.await?;

        assert_eq!(session.next_event().await, None);
        assert_eq!(session.drain_events(), 0);
        assert!(session.store().search().results.is_empty());
        assert!(session.store().notice().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn dropping_session_aborts_requests() -> Result<(), Box<dyn std::error::Error>> {
        let mut service = FakeService::default();
        let gate = service.gate("slow");
        let mut session = ForumSession::new(service, SearchOrdering::default());
        let sync = session.sync().clone();
        let handle = session.spawn_search("slow").ok_or("search not sent")?;

        drop(session);
        assert!(sync.is_shut_down());

        gate.notify_one();
        handle.await?;
        Ok(())
    }

    #[tokio::test]
    async fn opening_from_view_validates_url() {
        let mut session = ForumSession::new(FakeService::default(), SearchOrdering::default());
        session.store.set_documents(vec![
            Document {
                file_name: "no-url.pdf".to_string(),
                ..Document::default()
            },
            doc("a.pdf"),
        ]);
        let opener = RecordingOpener::default();

        assert!(matches!(
            session.open_document(0, &opener).await,
            Err(OpenError::MissingUrl)
        ));
        assert!(matches!(
            session.open_document(9, &opener).await,
            Err(OpenError::MissingUrl)
        ));
        assert!(session.open_document(1, &opener).await.is_ok());

        let opened = opener.opened.lock().map(|o| o.clone()).unwrap_or_default();
        assert_eq!(opened, vec!["http://x/a.pdf".to_string()]);
    }
}
