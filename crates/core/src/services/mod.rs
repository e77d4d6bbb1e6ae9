pub mod http;

pub use http::HttpDocumentService;
