//! Client-side query cache
//!
//! Results of read queries are kept per key until a write invalidates them.
//! Key format: v{VERSION}:{entity}:{identifier}[:sub_key]

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::feed::FeedQuery;

/// Cache schema version - increment when changing key formats
pub const CACHE_VERSION: u32 = 1;

/// Cached read queries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    CurrentUser,
    UserById(String),
    /// Newest users, by list size
    Users(usize),
    RecentPosts,
    /// One feed page, by query, page size and cursor (`None` is the first page)
    InfinitePosts {
        query: FeedQuery,
        limit: usize,
        cursor: Option<String>,
    },
    PostById(String),
    UserPosts(String),
    SearchPosts(String),
    SavedPosts(String),
}

impl QueryKey {
    pub fn as_key(&self) -> String {
        match self {
            QueryKey::CurrentUser => format!("v{}:user:current", CACHE_VERSION),
            QueryKey::UserById(id) => format!("v{}:user:{}", CACHE_VERSION, id),
            QueryKey::Users(limit) => format!("v{}:users:{}", CACHE_VERSION, limit),
            QueryKey::RecentPosts => format!("v{}:posts:recent", CACHE_VERSION),
            QueryKey::InfinitePosts {
                query,
                limit,
                cursor,
            } => {
                let scope = match query {
                    FeedQuery::All => "all".to_string(),
                    FeedQuery::Creator(id) => format!("creator:{}", id),
                    FeedQuery::Search(term) => format!("search:{}", term),
                };
                format!(
                    "v{}:posts:infinite:{}:{}:{}",
                    CACHE_VERSION,
                    scope,
                    limit,
                    cursor.as_deref().unwrap_or("start")
                )
            }
            QueryKey::PostById(id) => format!("v{}:post:{}", CACHE_VERSION, id),
            QueryKey::UserPosts(id) => format!("v{}:posts:user:{}", CACHE_VERSION, id),
            QueryKey::SearchPosts(term) => format!("v{}:posts:search:{}", CACHE_VERSION, term),
            QueryKey::SavedPosts(id) => format!("v{}:saves:{}", CACHE_VERSION, id),
        }
    }

    /// Prefix matching every post list (recent, infinite, per-user, search)
    pub fn all_post_lists() -> String {
        format!("v{}:posts:", CACHE_VERSION)
    }

    pub fn all_user_lists() -> String {
        format!("v{}:users:", CACHE_VERSION)
    }

    pub fn all_saved_lists() -> String {
        format!("v{}:saves:", CACHE_VERSION)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

pub struct QueryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl QueryCache {
    /// `ttl_secs == 0` keeps entries until they are invalidated
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_ttl((ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)))
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl
            .map_or(false, |ttl| entry.stored_at.elapsed() >= ttl)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let key = key.as_key();
        {
            let entries = self.entries.read().await;
            let entry = entries.get(&key)?;
            if !self.is_expired(entry) {
                return match serde_json::from_value(entry.value.clone()) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(key = %key, error = %e, "cached value has unexpected shape");
                        None
                    }
                };
            }
        }

        // Re-check under the write lock; a fresh value may have landed.
        let mut entries = self.entries.write().await;
        if entries.get(&key).map_or(false, |entry| self.is_expired(entry)) {
            debug!(key = %key, "cache entry expired");
            entries.remove(&key);
        }
        None
    }

    /// Store `value` under `key`, dropping any entries that have expired
    pub async fn set<T: Serialize>(&self, key: &QueryKey, value: &T) {
        let key = key.as_key();
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to serialize value for cache");
                return;
            }
        };

        let mut entries = self.entries.write().await;
        if self.ttl.is_some() {
            entries.retain(|_, entry| !self.is_expired(entry));
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.entries.read().await.contains_key(&key.as_key())
    }

    pub async fn invalidate(&self, key: &QueryKey) {
        self.entries.write().await.remove(&key.as_key());
    }

    pub async fn invalidate_many(&self, keys: &[QueryKey]) {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(&key.as_key());
        }
    }

    /// Remove every entry whose key starts with `prefix`; returns the count removed
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        debug!(prefix = %prefix, removed, "cache prefix invalidated");
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(0)
    }
}
