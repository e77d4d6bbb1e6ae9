pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod store;
pub mod sync;
pub mod traits;
pub mod view;

pub use config::{ClientConfig, Endpoints, DEFAULT_BASE_URL};
pub use error::{OpenError, SyncError};
pub use models::{Document, DocumentKind, SearchResponse, TextEntry, UploadFile};
pub use services::HttpDocumentService;
pub use session::ForumSession;
pub use store::{
    Action, Notice, Operation, SearchOrdering, SearchState, SearchTicket, SessionStore,
};
pub use sync::RemoteSync;
pub use traits::DocumentService;
pub use url;
pub use view::{open_document, select_view, DocumentOpener, View, ViewItem, ViewState};
