//! reqwest-backed client for the hosted backend's REST API

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::document::{Document, DocumentList};
use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::store::{
    Account, AccountService, BlobStore, DocumentStore, FileUpload, PreviewOptions, Session,
    StoredFile,
};

const PROJECT_HEADER: &str = "X-Appwrite-Project";

/// Error body returned by the backend on non-success responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP implementation of all collaborator traits
///
/// The session cookie set by `create_email_session` is kept in the client's
/// cookie store and sent on every later call.
#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
    config: RemoteConfig,
}

impl HttpRemote {
    pub fn new(config: RemoteConfig) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        let project = HeaderValue::from_str(&config.project_id)
            .map_err(|e| StoreError::Config(format!("Invalid project id: {}", e)))?;
        headers.insert(PROJECT_HEADER, project);

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.config.documents_url(collection),
            urlencoding::encode(id)
        )
    }

    fn file_url(&self, bucket: &str, id: &str) -> String {
        format!("{}/{}", self.config.files_url(bucket), urlencoding::encode(id))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
        let response = Self::check(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let fallback = status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => fallback,
        };

        warn!(status = status.as_u16(), %message, "remote call failed");
        Err(StoreError::from_status(status.as_u16(), message))
    }
}

#[async_trait]
impl DocumentStore for HttpRemote {
    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> StoreResult<Document> {
        debug!(%collection, %id, "create document");
        let response = self
            .client
            .post(self.config.documents_url(collection))
            .json(&json!({ "documentId": id, "data": data }))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Document> {
        debug!(%collection, %id, "get document");
        let response = self
            .client
            .get(self.document_url(collection, id))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> StoreResult<Document> {
        debug!(%collection, %id, "update document");
        let response = self
            .client
            .patch(self.document_url(collection, id))
            .json(&json!({ "data": data }))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        debug!(%collection, %id, "delete document");
        let response = self
            .client
            .delete(self.document_url(collection, id))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list_documents(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> StoreResult<DocumentList> {
        debug!(%collection, queries = queries.len(), "list documents");
        let params: Vec<(&str, String)> = queries
            .iter()
            .map(|query| ("queries[]", query.to_json()))
            .collect();

        let response = self
            .client
            .get(self.config.documents_url(collection))
            .query(&params)
            .send()
            .await?;
        Self::parse(response).await
    }
}

#[async_trait]
impl BlobStore for HttpRemote {
    async fn upload_file(
        &self,
        bucket: &str,
        id: &str,
        file: FileUpload,
    ) -> StoreResult<StoredFile> {
        debug!(%bucket, %id, size = file.len(), "upload file");
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = Form::new().text("fileId", id.to_string()).part("file", part);

        let response = self
            .client
            .post(self.config.files_url(bucket))
            .multipart(form)
            .send()
            .await?;
        Self::parse(response).await
    }

    fn file_preview(
        &self,
        bucket: &str,
        file_id: &str,
        options: &PreviewOptions,
    ) -> StoreResult<String> {
        if file_id.is_empty() {
            return Err(StoreError::InvalidRequest(
                "File id is required for a preview".to_string(),
            ));
        }

        Ok(format!(
            "{}/preview?width={}&height={}&gravity={}&quality={}&project={}",
            self.file_url(bucket, file_id),
            options.width,
            options.height,
            urlencoding::encode(&options.gravity),
            options.quality,
            urlencoding::encode(&self.config.project_id),
        ))
    }

    async fn delete_file(&self, bucket: &str, file_id: &str) -> StoreResult<()> {
        debug!(%bucket, %file_id, "delete file");
        let response = self
            .client
            .delete(self.file_url(bucket, file_id))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AccountService for HttpRemote {
    async fn create_account(
        &self,
        id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> StoreResult<Account> {
        debug!(%id, "create account");
        let response = self
            .client
            .post(format!("{}/account", self.config.endpoint))
            .json(&json!({
                "userId": id,
                "email": email,
                "password": password,
                "name": name,
            }))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn create_email_session(&self, email: &str, password: &str) -> StoreResult<Session> {
        debug!("create email session");
        let response = self
            .client
            .post(format!("{}/account/sessions/email", self.config.endpoint))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn get_account(&self) -> StoreResult<Account> {
        let response = self
            .client
            .get(format!("{}/account", self.config.endpoint))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        debug!(%session_id, "delete session");
        let response = self
            .client
            .delete(format!(
                "{}/account/sessions/{}",
                self.config.endpoint,
                urlencoding::encode(session_id)
            ))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    fn initials_avatar(&self, name: &str) -> String {
        format!(
            "{}/avatars/initials?name={}&project={}",
            self.config.endpoint,
            urlencoding::encode(name),
            urlencoding::encode(&self.config.project_id),
        )
    }
}
