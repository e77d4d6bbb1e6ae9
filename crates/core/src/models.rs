use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnError, DefaultOnNull};
use std::path::Path;

use crate::SyncError;

/// A snippet typed into the session. Never leaves the local store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TextEntry(String);

impl TextEntry {
    /// Returns `None` for empty or whitespace-only input. The text is kept as typed.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A file the backend knows about, either listed at startup, just uploaded,
/// or matched by a search.
///
/// The upload endpoint reports the display name as `original_name`, the other
/// endpoints as `file_name`; both land in [`Document::file_name`]. A `file_url`
/// that is absent, `null`, or not a string deserializes to `None`. All other
/// server fields are kept untouched in `extra`.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Document {
    #[serde(default, alias = "original_name")]
    pub file_name: String,

    #[serde_as(as = "DefaultOnError")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn new(file_name: impl Into<String>, file_url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_url: Some(file_url.into()),
            extra: Map::new(),
        }
    }

    /// The url to open, if there is a non-empty one.
    pub fn url(&self) -> Option<&str> {
        self.file_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn server_id(&self) -> Option<i64> {
        self.extra.get("id").and_then(Value::as_i64)
    }

    pub fn score(&self) -> Option<f64> {
        self.extra.get("score").and_then(Value::as_f64)
    }
}

/// Body of `GET /search/`.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: Option<String>,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub response: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub results: Vec<Document>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|ext| ext.to_str())?;
        if ext.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else if ext.eq_ignore_ascii_case("docx") {
            Some(Self::Docx)
        } else {
            None
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// A file picked for upload, held fully in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type =
            DocumentKind::from_path(Path::new(&file_name)).map(|kind| kind.content_type().to_string());
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Reads a `.pdf` or `.docx` file from disk. Other extensions are refused.
    pub async fn from_path(path: &Path) -> Result<Self, SyncError> {
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| SyncError::UnsupportedFile(path.display().to_string()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                SyncError::InvalidInput(format!("path has no file name: {}", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;

        Ok(Self {
            file_name,
            content_type: Some(kind.content_type().to_string()),
            bytes,
        })
    }
}
