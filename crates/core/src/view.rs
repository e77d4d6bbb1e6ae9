use async_trait::async_trait;
use tracing::{error, info};
use url::Url;

use crate::error::OpenError;
use crate::models::{Document, TextEntry};
use crate::store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    AllDocuments,
    SearchResults,
}

/// What is on screen right now. Borrowed from the store, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View<'a> {
    pub state: ViewState,
    pub entries: &'a [TextEntry],
    pub documents: &'a [Document],
    pub summary: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewItem<'a> {
    Text(&'a TextEntry),
    Document(&'a Document),
}

impl<'a> View<'a> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.documents.is_empty()
    }

    /// Text entries first, then documents.
    pub fn items(&self) -> impl Iterator<Item = ViewItem<'a>> + 'a {
        let entries = self.entries;
        let documents = self.documents;
        entries
            .iter()
            .map(ViewItem::Text)
            .chain(documents.iter().map(ViewItem::Document))
    }

    /// The `index`-th document of the view, counting documents only.
    pub fn document(&self, index: usize) -> Option<&'a Document> {
        self.documents.get(index)
    }
}

pub fn select_view(store: &SessionStore) -> View<'_> {
    let search = store.search();
    if search.results.is_empty() {
        View {
            state: ViewState::AllDocuments,
            entries: store.entries(),
            documents: store.documents(),
            summary: &search.summary,
        }
    } else {
        View {
            state: ViewState::SearchResults,
            entries: &[],
            documents: &search.results,
            summary: &search.summary,
        }
    }
}

/// Something that can show a document url in a new viewing context.
#[async_trait]
pub trait DocumentOpener {
    async fn open(&self, url: &Url) -> Result<(), OpenError>;
}

/// Validates the url and hands it to `opener`. Failures are logged and
/// returned; the opener is never called for a missing or malformed url.
pub async fn open_document<O>(url: Option<&str>, opener: &O) -> Result<(), OpenError>
where
    O: DocumentOpener + ?Sized,
{
    let url = match parse_document_url(url) {
        Ok(url) => url,
        Err(err) => {
            error!(error = %err, "cannot open document");
            return Err(err);
        }
    };

    info!(url = %url, "opening document");
    opener.open(&url).await.map_err(|err| {
        error!(error = %err, url = %url, "document viewer failed");
        err
    })
}

fn parse_document_url(url: Option<&str>) -> Result<Url, OpenError> {
    let raw = url
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or(OpenError::MissingUrl)?;
    Url::parse(raw).map_err(|reason| OpenError::InvalidUrl {
        url: raw.to_string(),
        reason,
    })
}
