//! Shared fixtures for the Snapgram client integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use remote_store::{
    Document, DocumentList, DocumentStore, FileUpload, InMemoryRemote, Query, RemoteConfig,
    StoreResult,
};
use serde_json::{json, Value};
use snapgram_client::error::Result;
use snapgram_client::services::Backend;
use snapgram_client::{AppError, Config, FeedQuery, PageSource, Post, Snapgram};
use tokio::sync::Semaphore;

pub const MEDIA: &str = "media";
pub const POSTS: &str = "posts";
pub const USERS: &str = "users";
pub const SAVES: &str = "saves";

pub fn test_config() -> Config {
    Config::new(RemoteConfig::new("memory://local/v1", "local", "main"))
}

/// Client wired to a fresh in-memory backend
pub fn test_app() -> (Snapgram, Arc<InMemoryRemote>) {
    let remote = Arc::new(InMemoryRemote::new());
    let app = Snapgram::new(test_config(), Backend::from_remote(remote.clone()));
    (app, remote)
}

pub fn png(name: &str) -> FileUpload {
    FileUpload::new(name, "image/png", vec![0x89, 0x50, 0x4e, 0x47])
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Creation time `minutes` after the fixture base time
pub fn at(minutes: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(minutes)
}

pub fn post_document(id: &str, creator: &str, created_at: DateTime<Utc>) -> Document {
    Document::new(
        id,
        created_at,
        json!({
            "creator": creator,
            "caption": format!("caption for {}", id),
            "imageUrl": format!("memory://local/v1/storage/buckets/media/files/file-{}/preview", id),
            "imageId": format!("file-{}", id),
            "location": "Lisbon",
            "tags": ["travel"],
            "likes": [],
        }),
    )
}

/// Seed a post together with the blob its document points at
pub fn seed_post(remote: &InMemoryRemote, id: &str, creator: &str, created_at: DateTime<Utc>) {
    remote.seed_file(MEDIA, &format!("file-{}", id), &format!("{}.png", id));
    remote.seed_document(POSTS, post_document(id, creator, created_at));
}

/// Seed `count` posts `p00`, `p01`, ... one minute apart
pub fn seed_posts(remote: &InMemoryRemote, count: usize, creator: &str) -> Vec<String> {
    (0..count)
        .map(|i| {
            let id = format!("p{:02}", i);
            seed_post(remote, &id, creator, at(i as i64));
            id
        })
        .collect()
}

pub fn seed_user(remote: &InMemoryRemote, id: &str, account_id: &str, image_id: Option<&str>) {
    let image_id = image_id.map(|id| Value::String(id.to_string())).unwrap_or(Value::Null);
    remote.seed_document(
        USERS,
        Document::new(
            id,
            base_time(),
            json!({
                "accountId": account_id,
                "name": "Grace Hopper",
                "username": "grace",
                "email": "grace@example.com",
                "imageUrl": "memory://local/v1/avatars/initials?name=Grace",
                "imageId": image_id,
                "bio": "",
                "save": [],
            }),
        ),
    );
}

pub fn field(doc: &Document, name: &str) -> Option<String> {
    doc.field(name).and_then(Value::as_str).map(str::to_string)
}

/// Document store whose list calls wait for a permit before running
///
/// Lets a test hold a page request open while it inspects or resets a pager.
pub struct GatedStore {
    inner: Arc<InMemoryRemote>,
    gate: Semaphore,
    lists: AtomicUsize,
}

impl GatedStore {
    pub fn new(inner: Arc<InMemoryRemote>) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
            lists: AtomicUsize::new(0),
        }
    }

    /// Let `n` waiting or future list calls through
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn create_document(&self, collection: &str, id: &str, data: Value) -> StoreResult<Document> {
        self.inner.create_document(collection, id, data).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Document> {
        self.inner.get_document(collection, id).await
    }

    async fn update_document(&self, collection: &str, id: &str, data: Value) -> StoreResult<Document> {
        self.inner.update_document(collection, id, data).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.inner.delete_document(collection, id).await
    }

    async fn list_documents(&self, collection: &str, queries: &[Query]) -> StoreResult<DocumentList> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        self.inner.list_documents(collection, queries).await
    }
}

/// Page source replaying canned pages in order, then empty pages
pub struct ScriptedSource {
    pages: Mutex<Vec<Result<Vec<Post>>>>,
    requests: Mutex<Vec<(FeedQuery, Option<String>)>>,
}

impl ScriptedSource {
    pub fn new(pages: Vec<Result<Vec<Post>>>) -> Self {
        let mut pages = pages;
        pages.reverse();
        Self {
            pages: Mutex::new(pages),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Cursors the pager asked for, in order
    pub fn cursors(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, cursor)| cursor.clone())
            .collect()
    }
}

#[async_trait]
impl PageSource<Post> for ScriptedSource {
    async fn fetch_page(&self, query: &FeedQuery, cursor: Option<&str>, _limit: usize) -> Result<Vec<Post>> {
        self.requests
            .lock()
            .unwrap()
            .push((query.clone(), cursor.map(str::to_string)));
        self.pages.lock().unwrap().pop().unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn post(id: &str, created_at: DateTime<Utc>) -> Post {
    post_document(id, "u1", created_at).decode().unwrap()
}

pub fn page_error() -> AppError {
    AppError::Internal("connection reset".to_string())
}
