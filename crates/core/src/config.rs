use std::time::Duration;
use url::Url;

use crate::SyncError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// `None` waits until the transport gives up.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn endpoints(&self) -> Result<Endpoints, SyncError> {
        Endpoints::new(&self.base_url)
    }
}

/// Resolved urls for the three backend routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    files: Url,
    upload: Url,
    search: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            files: base.join("files/")?,
            upload: base.join("upload/")?,
            search: base.join("search/")?,
        })
    }

    pub fn files(&self) -> &Url {
        &self.files
    }

    pub fn upload(&self) -> &Url {
        &self.upload
    }

    /// `search/?query=...` with the query as the only parameter.
    pub fn search(&self, query: &str) -> Url {
        let mut url = self.search.clone();
        url.query_pairs_mut().clear().append_pair("query", query);
        url
    }
}
