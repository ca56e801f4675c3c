/// Configuration management for the Snapgram client
///
/// Values come from environment variables (a `.env` file is honored) with
/// defaults for everything except the backend project and database.
use remote_store::{PreviewOptions, RemoteConfig};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosted backend connection
    pub remote: RemoteConfig,
    /// Collection ids inside the database
    pub collections: CollectionsConfig,
    /// File storage settings
    pub storage: StorageConfig,
    /// Feed and list sizes
    pub feed: FeedConfig,
    /// Cache settings
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsConfig {
    pub users: String,
    pub posts: String,
    pub saves: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            users: "users".to_string(),
            posts: "posts".to_string(),
            saves: "saves".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket holding post images and avatars
    pub bucket: String,
    /// Preview rendering used for stored image URLs
    pub preview: PreviewOptions,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "media".to_string(),
            preview: PreviewOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Items per infinite-scroll page
    pub page_size: usize,
    /// Size of the "recent posts" list
    pub recent_limit: usize,
    /// Default size of the creators list
    pub users_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 9,
            recent_limit: 20,
            users_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds a cached query stays fresh; 0 keeps entries until invalidated
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 0 }
    }
}

impl Config {
    /// Configuration with default collections and sizes for the given backend
    pub fn new(remote: RemoteConfig) -> Self {
        Self {
            remote,
            collections: CollectionsConfig::default(),
            storage: StorageConfig::default(),
            feed: FeedConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let remote = RemoteConfig::from_env()?;
        let defaults = Self::new(remote);

        Ok(Config {
            collections: CollectionsConfig {
                users: env_or("APPWRITE_USER_COLLECTION_ID", &defaults.collections.users),
                posts: env_or("APPWRITE_POST_COLLECTION_ID", &defaults.collections.posts),
                saves: env_or("APPWRITE_SAVES_COLLECTION_ID", &defaults.collections.saves),
            },
            storage: StorageConfig {
                bucket: env_or("APPWRITE_STORAGE_ID", &defaults.storage.bucket),
                preview: PreviewOptions {
                    width: env_parse("PREVIEW_WIDTH", defaults.storage.preview.width)?,
                    height: env_parse("PREVIEW_HEIGHT", defaults.storage.preview.height)?,
                    gravity: env_or("PREVIEW_GRAVITY", &defaults.storage.preview.gravity),
                    quality: env_parse("PREVIEW_QUALITY", defaults.storage.preview.quality)?,
                },
            },
            feed: FeedConfig {
                page_size: env_parse("FEED_PAGE_SIZE", defaults.feed.page_size)?,
                recent_limit: env_parse("FEED_RECENT_LIMIT", defaults.feed.recent_limit)?,
                users_limit: env_parse("FEED_USERS_LIMIT", defaults.feed.users_limit)?,
            },
            cache: CacheConfig {
                ttl_secs: env_parse("QUERY_CACHE_TTL_SECS", defaults.cache.ttl_secs)?,
            },
            remote: defaults.remote,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Internal(format!("{} must be a valid number, got '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}
