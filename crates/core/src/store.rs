//! Session state and its transitions.
//!
//! Every mutation goes through [`SessionStore::apply`], which dispatches one
//! [`Action`] to a single transition. The convenience methods
//! (`add_text_entry`, `set_documents`, ...) are thin wrappers over the same
//! transitions so that callers without an action in hand read naturally.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::models::{Document, SearchResponse, TextEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListDocuments,
    Upload,
    Search,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ListDocuments => "list documents",
            Self::Upload => "upload",
            Self::Search => "search",
        };
        f.write_str(name)
    }
}

/// The most recent swallowed failure, kept for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub operation: Operation,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// How search responses that arrive out of order are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchOrdering {
    /// Whichever response arrives last is shown.
    #[default]
    LastWriteWins,
    /// Responses issued before the one currently shown are dropped.
    LatestIssued,
}

impl FromStr for SearchOrdering {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last-write-wins" | "last_write_wins" => Ok(Self::LastWriteWins),
            "latest-issued" | "latest_issued" => Ok(Self::LatestIssued),
            other => Err(format!(
                "unknown search ordering `{other}` (expected last-write-wins or latest-issued)"
            )),
        }
    }
}

/// Monotonic tag handed out when a search is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearchTicket(u64);

impl SearchTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchState {
    pub results: Vec<Document>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddTextEntry(String),
    AddDocument(Document),
    SetDocuments(Vec<Document>),
    SetSearch {
        results: Vec<Document>,
        summary: String,
    },
    SetSearchQuery(String),
    ClearSearchQuery,
    DocumentsLoaded(Vec<Document>),
    DocumentUploaded(Document),
    SearchCompleted {
        ticket: SearchTicket,
        response: SearchResponse,
    },
    /// `ticket` is set for failed searches so stale failures can be dropped.
    RequestFailed {
        operation: Operation,
        message: String,
        ticket: Option<SearchTicket>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    entries: Vec<TextEntry>,
    documents: Vec<Document>,
    search: SearchState,
    search_query: String,
    ordering: SearchOrdering,
    next_ticket: u64,
    applied_ticket: Option<SearchTicket>,
    notice: Option<Notice>,
}

impl SessionStore {
    pub fn new(ordering: SearchOrdering) -> Self {
        Self {
            ordering,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> &[TextEntry] {
        &self.entries
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn ordering(&self) -> SearchOrdering {
        self.ordering
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Tags a search about to be sent. Tickets strictly increase.
    pub fn issue_search_ticket(&mut self) -> SearchTicket {
        self.next_ticket += 1;
        SearchTicket(self.next_ticket)
    }

    /// Applies one action. Returns `true` only when session data changed;
    /// rejected or discarded actions and recorded failures return `false`.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::AddTextEntry(text) => self.push_entry(text),
            Action::AddDocument(document) => {
                self.documents.push(document);
                true
            }
            Action::SetDocuments(documents) => {
                self.documents = documents;
                true
            }
            Action::SetSearch { results, summary } => {
                self.search = SearchState { results, summary };
                true
            }
            Action::SetSearchQuery(query) => {
                self.search_query = query;
                true
            }
            Action::ClearSearchQuery => {
                self.search_query.clear();
                true
            }
            Action::DocumentsLoaded(documents) => {
                self.clear_notice(Operation::ListDocuments);
                self.documents = documents;
                true
            }
            Action::DocumentUploaded(document) => {
                self.clear_notice(Operation::Upload);
                self.documents.push(document);
                true
            }
            Action::SearchCompleted { ticket, response } => self.complete_search(ticket, response),
            Action::RequestFailed {
                operation,
                message,
                ticket,
            } => {
                if ticket.is_some_and(|ticket| self.is_stale(ticket)) {
                    warn!(%operation, "discarding failure of a stale search");
                    return false;
                }
                self.notice = Some(Notice {
                    operation,
                    message,
                    at: Utc::now(),
                });
                false
            }
        }
    }

    pub fn add_text_entry(&mut self, text: impl Into<String>) -> bool {
        self.apply(Action::AddTextEntry(text.into()))
    }

    pub fn add_document(&mut self, document: Document) {
        self.apply(Action::AddDocument(document));
    }

    pub fn set_documents(&mut self, documents: Vec<Document>) {
        self.apply(Action::SetDocuments(documents));
    }

    /// Replaces results and summary together.
    pub fn set_search(&mut self, results: Vec<Document>, summary: impl Into<String>) {
        self.apply(Action::SetSearch {
            results,
            summary: summary.into(),
        });
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.apply(Action::SetSearchQuery(query.into()));
    }

    pub fn clear_search_query(&mut self) {
        self.apply(Action::ClearSearchQuery);
    }

    fn push_entry(&mut self, text: String) -> bool {
        match TextEntry::new(text) {
            Some(entry) => {
                self.entries.push(entry);
                true
            }
            None => {
                debug!("ignoring blank text entry");
                false
            }
        }
    }

    fn is_stale(&self, ticket: SearchTicket) -> bool {
        self.ordering == SearchOrdering::LatestIssued
            && self.applied_ticket.is_some_and(|applied| ticket < applied)
    }

    fn complete_search(&mut self, ticket: SearchTicket, response: SearchResponse) -> bool {
        if self.is_stale(ticket) {
            warn!(
                ticket = ticket.value(),
                applied = self.applied_ticket.map(SearchTicket::value),
                "discarding stale search response"
            );
            return false;
        }

        self.clear_notice(Operation::Search);
        self.applied_ticket = Some(ticket);
        self.search = SearchState {
            results: response.results,
            summary: response.response,
        };
        true
    }

    fn clear_notice(&mut self, operation: Operation) {
        if self
            .notice
            .as_ref()
            .is_some_and(|notice| notice.operation == operation)
        {
            self.notice = None;
        }
    }
}
