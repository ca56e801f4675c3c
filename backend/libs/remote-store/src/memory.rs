//! In-memory implementation of the collaborator traits
//!
//! Evaluates the same query predicates as the hosted backend, records every
//! call in order, and can be told to fail the next N calls of an operation.
//! Used by tests and for running the client offline.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::debug;

use crate::document::{Document, DocumentList};
use crate::error::{StoreError, StoreResult};
use crate::query::{Query, DEFAULT_LIMIT};
use crate::store::{
    Account, AccountService, BlobStore, DocumentStore, FileUpload, PreviewOptions, Session,
    StoredFile,
};

/// Remote operation kinds, used for call recording and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateDocument,
    GetDocument,
    UpdateDocument,
    DeleteDocument,
    ListDocuments,
    UploadFile,
    FilePreview,
    DeleteFile,
    CreateAccount,
    CreateSession,
    GetAccount,
    DeleteSession,
}

/// One recorded call: the operation and its `collection/id` or `bucket/id` target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub target: String,
}

impl Call {
    pub fn new(operation: Operation, target: impl Into<String>) -> Self {
        Self {
            operation,
            target: target.into(),
        }
    }
}

struct AccountRecord {
    account: Account,
    password: String,
}

#[derive(Default)]
struct MemoryState {
    collections: HashMap<String, HashMap<String, Document>>,
    files: HashMap<String, HashMap<String, StoredFile>>,
    accounts: HashMap<String, AccountRecord>,
    session: Option<Session>,
    session_seq: u64,
    failures: HashMap<Operation, usize>,
    calls: Vec<Call>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Strictly increasing timestamps so creation order is always observable
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::milliseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }
}

pub struct InMemoryRemote {
    state: Mutex<MemoryState>,
    endpoint: String,
    project_id: String,
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            endpoint: "memory://local/v1".to_string(),
            project_id: "local".to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and apply any pending injected failure
    fn begin(&self, operation: Operation, target: String) -> StoreResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.calls.push(Call::new(operation, target));

        if let Some(remaining) = state.failures.get_mut(&operation) {
            if *remaining > 0 {
                *remaining -= 1;
                debug!(?operation, "injected failure");
                return Err(StoreError::Remote {
                    status: 500,
                    message: format!("injected failure: {:?}", operation),
                });
            }
        }

        Ok(state)
    }

    /// Make the next call of `operation` fail
    pub fn fail_next(&self, operation: Operation) {
        self.fail_next_n(operation, 1);
    }

    pub fn fail_next_n(&self, operation: Operation, times: usize) {
        *self.lock().failures.entry(operation).or_insert(0) += times;
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Index of the first recorded call matching `operation` and `target`
    pub fn call_position(&self, operation: Operation, target: &str) -> Option<usize> {
        self.lock()
            .calls
            .iter()
            .position(|call| call.operation == operation && call.target == target)
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.lock()
            .collections
            .get(collection)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Insert a document as-is, keeping its timestamps
    pub fn seed_document(&self, collection: &str, document: Document) {
        let mut state = self.lock();
        if state.last_timestamp.map_or(true, |last| document.created_at > last) {
            state.last_timestamp = Some(document.created_at);
        }
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(document.id.clone(), document);
    }

    pub fn has_file(&self, bucket: &str, id: &str) -> bool {
        self.lock()
            .files
            .get(bucket)
            .map_or(false, |files| files.contains_key(id))
    }

    pub fn file_count(&self, bucket: &str) -> usize {
        self.lock().files.get(bucket).map(HashMap::len).unwrap_or(0)
    }

    pub fn seed_file(&self, bucket: &str, id: &str, name: &str) {
        let file = StoredFile {
            id: id.to_string(),
            bucket_id: bucket.to_string(),
            name: name.to_string(),
            mime_type: String::new(),
            size_original: 0,
        };
        self.lock()
            .files
            .entry(bucket.to_string())
            .or_default()
            .insert(id.to_string(), file);
    }

    pub fn current_session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    fn preview_url(&self, bucket: &str, file_id: &str, options: &PreviewOptions) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/preview?width={}&height={}&gravity={}&quality={}&project={}",
            self.endpoint,
            bucket,
            file_id,
            options.width,
            options.height,
            options.gravity,
            options.quality,
            self.project_id,
        )
    }
}

fn object_fields(data: Value) -> StoreResult<serde_json::Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidRequest(format!(
            "Document data must be an object, got {}",
            other
        ))),
    }
}

/// Relations may be stored expanded; compare them by id
fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => map.get("$id").cloned().unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

fn matches_filter(document: &Document, query: &Query) -> bool {
    match query {
        Query::Equal { attribute, values } => match document.attribute(attribute) {
            Some(Value::Array(items)) => items
                .iter()
                .any(|item| values.contains(&normalize(item))),
            Some(value) => values.contains(&normalize(&value)),
            None => false,
        },
        Query::Search { attribute, term } => {
            let haystack = match document.attribute(attribute) {
                Some(Value::String(text)) => text.to_lowercase(),
                _ => return false,
            };
            let mut words = term.split_whitespace().peekable();
            if words.peek().is_none() {
                return true;
            }
            words.any(|word| haystack.contains(&word.to_lowercase()))
        }
        _ => true,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn compare_attribute(a: &Document, b: &Document, attribute: &str) -> Ordering {
    match attribute {
        "$createdAt" => a.created_at.cmp(&b.created_at),
        "$updatedAt" => a.updated_at.cmp(&b.updated_at),
        "$id" => a.id.cmp(&b.id),
        other => compare_values(a.field(other), b.field(other)),
    }
}

fn evaluate(documents: Vec<Document>, queries: &[Query]) -> StoreResult<DocumentList> {
    let mut matched: Vec<Document> = documents
        .into_iter()
        .filter(|doc| queries.iter().all(|query| matches_filter(doc, query)))
        .collect();

    let orders: Vec<(&str, bool)> = queries
        .iter()
        .filter_map(|query| match query {
            Query::OrderAsc(attribute) => Some((attribute.as_str(), false)),
            Query::OrderDesc(attribute) => Some((attribute.as_str(), true)),
            _ => None,
        })
        .collect();
    let tie_break_desc = orders.first().map_or(false, |(_, desc)| *desc);

    matched.sort_by(|a, b| {
        for (attribute, desc) in &orders {
            let ordering = compare_attribute(a, b, attribute);
            let ordering = if *desc { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        let ordering = a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id));
        if tie_break_desc {
            ordering.reverse()
        } else {
            ordering
        }
    });

    let total = matched.len() as u64;
    let limit = queries
        .iter()
        .rev()
        .find_map(|query| match query {
            Query::Limit(limit) => Some(*limit),
            _ => None,
        })
        .unwrap_or(DEFAULT_LIMIT);

    for query in queries {
        match query {
            Query::CursorAfter(id) => {
                let position = cursor_position(&matched, id)?;
                matched = matched.split_off(position + 1);
            }
            Query::CursorBefore(id) => {
                let position = cursor_position(&matched, id)?;
                matched.truncate(position);
                let skip = matched.len().saturating_sub(limit);
                matched.drain(..skip);
            }
            _ => {}
        }
    }

    matched.truncate(limit);

    Ok(DocumentList {
        total,
        documents: matched,
    })
}

fn cursor_position(documents: &[Document], id: &str) -> StoreResult<usize> {
    documents
        .iter()
        .position(|doc| doc.id == id)
        .ok_or_else(|| {
            StoreError::InvalidRequest(format!(
                "Document '{}' for the 'cursor' value not found.",
                id
            ))
        })
}

#[async_trait]
impl DocumentStore for InMemoryRemote {
    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> StoreResult<Document> {
        let mut state = self.begin(
            Operation::CreateDocument,
            format!("{}/{}", collection, id),
        )?;
        let fields = object_fields(data)?;

        if state
            .collections
            .get(collection)
            .map_or(false, |docs| docs.contains_key(id))
        {
            return Err(StoreError::Conflict(format!(
                "Document with the requested ID '{}' already exists",
                id
            )));
        }

        let now = state.next_timestamp();
        let document = Document::new(id, now, Value::Object(fields));
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document.clone());

        Ok(document)
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Document> {
        let state = self.begin(Operation::GetDocument, format!("{}/{}", collection, id))?;
        state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Document '{}' not found", id)))
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> StoreResult<Document> {
        let mut state = self.begin(
            Operation::UpdateDocument,
            format!("{}/{}", collection, id),
        )?;
        let fields = object_fields(data)?;
        let now = state.next_timestamp();

        let document = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound(format!("Document '{}' not found", id)))?;
        document.apply_patch(fields, now);

        Ok(document.clone())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut state = self.begin(
            Operation::DeleteDocument,
            format!("{}/{}", collection, id),
        )?;
        state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("Document '{}' not found", id)))
    }

    async fn list_documents(
        &self,
        collection: &str,
        queries: &[Query],
    ) -> StoreResult<DocumentList> {
        let state = self.begin(Operation::ListDocuments, collection.to_string())?;
        let documents: Vec<Document> = state
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        drop(state);

        evaluate(documents, queries)
    }
}

#[async_trait]
impl BlobStore for InMemoryRemote {
    async fn upload_file(
        &self,
        bucket: &str,
        id: &str,
        file: FileUpload,
    ) -> StoreResult<StoredFile> {
        let mut state = self.begin(Operation::UploadFile, format!("{}/{}", bucket, id))?;
        let files = state.files.entry(bucket.to_string()).or_default();
        if files.contains_key(id) {
            return Err(StoreError::Conflict(format!(
                "File with the requested ID '{}' already exists",
                id
            )));
        }

        let stored = StoredFile {
            id: id.to_string(),
            bucket_id: bucket.to_string(),
            name: file.file_name,
            mime_type: file.content_type,
            size_original: file.bytes.len() as u64,
        };
        files.insert(id.to_string(), stored.clone());

        Ok(stored)
    }

    fn file_preview(
        &self,
        bucket: &str,
        file_id: &str,
        options: &PreviewOptions,
    ) -> StoreResult<String> {
        let state = self.begin(Operation::FilePreview, format!("{}/{}", bucket, file_id))?;
        let exists = state
            .files
            .get(bucket)
            .map_or(false, |files| files.contains_key(file_id));
        drop(state);

        if !exists {
            return Err(StoreError::NotFound(format!("File '{}' not found", file_id)));
        }
        Ok(self.preview_url(bucket, file_id, options))
    }

    async fn delete_file(&self, bucket: &str, file_id: &str) -> StoreResult<()> {
        let mut state = self.begin(Operation::DeleteFile, format!("{}/{}", bucket, file_id))?;
        state
            .files
            .get_mut(bucket)
            .and_then(|files| files.remove(file_id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("File '{}' not found", file_id)))
    }
}

#[async_trait]
impl AccountService for InMemoryRemote {
    async fn create_account(
        &self,
        id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> StoreResult<Account> {
        let mut state = self.begin(Operation::CreateAccount, email.to_string())?;
        if state.accounts.contains_key(email) {
            return Err(StoreError::Conflict(format!(
                "A user with the same email '{}' already exists",
                email
            )));
        }

        let account = Account {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        };
        state.accounts.insert(
            email.to_string(),
            AccountRecord {
                account: account.clone(),
                password: password.to_string(),
            },
        );

        Ok(account)
    }

    async fn create_email_session(&self, email: &str, password: &str) -> StoreResult<Session> {
        let mut state = self.begin(Operation::CreateSession, email.to_string())?;
        if state.session.is_some() {
            return Err(StoreError::Unauthorized(
                "Creation of a session is prohibited when a session is active".to_string(),
            ));
        }

        let user_id = match state.accounts.get(email) {
            Some(record) if record.password == password => record.account.id.clone(),
            _ => {
                return Err(StoreError::Unauthorized(
                    "Invalid credentials. Please check the email and password.".to_string(),
                ))
            }
        };

        state.session_seq += 1;
        let now = state.next_timestamp();
        let session = Session {
            id: format!("session-{}", state.session_seq),
            user_id,
            expire: Some(now + Duration::days(365)),
        };
        state.session = Some(session.clone());

        Ok(session)
    }

    async fn get_account(&self) -> StoreResult<Account> {
        let state = self.begin(Operation::GetAccount, "current".to_string())?;
        let session = state.session.as_ref().ok_or_else(|| {
            StoreError::Unauthorized("User (role: guests) missing scope (account)".to_string())
        })?;

        state
            .accounts
            .values()
            .find(|record| record.account.id == session.user_id)
            .map(|record| record.account.clone())
            .ok_or_else(|| StoreError::NotFound("Account not found".to_string()))
    }

    async fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        let mut state = self.begin(Operation::DeleteSession, session_id.to_string())?;
        match &state.session {
            Some(session) if session_id == "current" || session.id == session_id => {
                state.session = None;
                Ok(())
            }
            Some(_) => Err(StoreError::NotFound(format!(
                "Session '{}' not found",
                session_id
            ))),
            None => Err(StoreError::Unauthorized("No active session".to_string())),
        }
    }

    fn initials_avatar(&self, name: &str) -> String {
        format!(
            "{}/avatars/initials?name={}&project={}",
            self.endpoint,
            urlencoding::encode(name),
            self.project_id
        )
    }
}
