//! Collaborator contracts for the hosted backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Document, DocumentList};
use crate::error::StoreResult;
use crate::query::Query;

/// Collection-oriented document storage
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> StoreResult<Document>;

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Document>;

    /// Partial update: only the keys present in `data` change
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> StoreResult<Document>;

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()>;

    async fn list_documents(&self, collection: &str, queries: &[Query])
        -> StoreResult<DocumentList>;
}

/// Binary file storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload_file(&self, bucket: &str, id: &str, file: FileUpload)
        -> StoreResult<StoredFile>;

    /// Build the preview URL for a stored file (no request is made)
    fn file_preview(
        &self,
        bucket: &str,
        file_id: &str,
        options: &PreviewOptions,
    ) -> StoreResult<String>;

    async fn delete_file(&self, bucket: &str, file_id: &str) -> StoreResult<()>;
}

/// Accounts and sessions
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn create_account(
        &self,
        id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> StoreResult<Account>;

    async fn create_email_session(&self, email: &str, password: &str) -> StoreResult<Session>;

    /// Account owning the current session
    async fn get_account(&self) -> StoreResult<Account>;

    /// Delete a session; `"current"` targets the active one
    async fn delete_session(&self, session_id: &str) -> StoreResult<()>;

    /// URL of a generated initials avatar
    fn initials_avatar(&self, name: &str) -> String;
}

/// File payload handed to `upload_file`
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Metadata of an uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "bucketId")]
    pub bucket_id: String,
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size_original: u64,
}

/// Preview rendering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewOptions {
    pub width: u32,
    pub height: u32,
    pub gravity: String,
    pub quality: u8,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 2000,
            gravity: "top".to_string(),
            quality: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub expire: Option<DateTime<Utc>>,
}
