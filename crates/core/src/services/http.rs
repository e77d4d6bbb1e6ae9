use crate::config::{ClientConfig, Endpoints};
use crate::traits::DocumentService;
use crate::{Document, SearchResponse, SyncError, UploadFile};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// `DocumentService` over the forum's REST routes.
#[derive(Clone)]
pub struct HttpDocumentService {
    client: Arc<Client>,
    endpoints: Endpoints,
}

impl HttpDocumentService {
    pub fn new(config: &ClientConfig) -> Result<Self, SyncError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: Arc::new(builder.build()?),
            endpoints: config.endpoints()?,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn list_documents(&self) -> Result<Vec<Document>, SyncError> {
        let url = self.endpoints.files().clone();
        debug!(url = %url, "listing documents");

        let response = self.client.get(url).send().await?;
        decode(response, "files").await
    }

    async fn upload_file(&self, file: &UploadFile) -> Result<Document, SyncError> {
        let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().part("file", part);

        let url = self.endpoints.upload().clone();
        debug!(url = %url, file_name = %file.file_name, size = file.bytes.len(), "uploading file");

        let response = self.client.post(url).multipart(form).send().await?;
        decode(response, "upload").await
    }

    async fn search(&self, query: &str) -> Result<SearchResponse, SyncError> {
        let url = self.endpoints.search(query);
        debug!(url = %url, "searching documents");

        let response = self.client.get(url).send().await?;
        decode(response, "search").await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T, SyncError> {
    if !response.status().is_success() {
        return Err(SyncError::BackendResponse {
            endpoint: endpoint.to_string(),
            details: response.status().to_string(),
        });
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
