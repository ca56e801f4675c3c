/// Application facade wiring configuration, collaborators and services
use std::sync::Arc;

use remote_store::HttpRemote;
use tracing::info;

use crate::cache::QueryCache;
use crate::config::Config;
use crate::error::Result;
use crate::feed::{DocumentPageSource, FeedPager, FeedQuery};
use crate::models::{Post, User};
use crate::services::{AuthService, Backend, MediaService, PostService, SaveService, UserService};

pub struct Snapgram {
    config: Arc<Config>,
    backend: Backend,
    cache: Arc<QueryCache>,
    pub auth: AuthService,
    pub posts: Arc<PostService>,
    pub saves: SaveService,
    pub users: UserService,
}

impl Snapgram {
    pub fn new(config: Config, backend: Backend) -> Self {
        let cache = Arc::new(QueryCache::new(config.cache.ttl_secs));
        let media = MediaService::new(
            backend.blobs.clone(),
            config.storage.bucket.clone(),
            config.storage.preview.clone(),
        );
        let collections = &config.collections;

        let auth = AuthService::new(
            backend.accounts.clone(),
            backend.documents.clone(),
            collections.users.clone(),
        )
        .with_cache(cache.clone());
        let posts = Arc::new(
            PostService::new(
                backend.documents.clone(),
                media.clone(),
                collections.posts.clone(),
                config.feed.recent_limit,
                config.feed.page_size,
            )
            .with_cache(cache.clone()),
        );
        let saves = SaveService::new(
            backend.documents.clone(),
            collections.saves.clone(),
            collections.posts.clone(),
        )
        .with_cache(cache.clone());
        let users = UserService::new(
            backend.documents.clone(),
            media,
            collections.users.clone(),
            config.feed.users_limit,
        )
        .with_cache(cache.clone());

        Self {
            config: Arc::new(config),
            backend,
            cache,
            auth,
            posts,
            saves,
            users,
        }
    }

    /// Connect to the hosted backend described by `config`
    pub fn connect(config: Config) -> Result<Self> {
        let remote = Arc::new(HttpRemote::new(config.remote.clone())?);
        info!(
            endpoint = %config.remote.endpoint,
            project = %config.remote.project_id,
            "connected to remote store"
        );
        Ok(Self::new(config, Backend::from_remote(remote)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Home feed: every post, newest first
    pub fn home_feed(&self) -> FeedPager<Post> {
        self.post_pager(FeedQuery::All)
    }

    pub fn creator_feed(&self, user_id: impl Into<String>) -> FeedPager<Post> {
        self.post_pager(FeedQuery::Creator(user_id.into()))
    }

    pub fn search_feed(&self, term: impl Into<String>) -> FeedPager<Post> {
        self.post_pager(FeedQuery::Search(term.into()))
    }

    /// All users, newest first
    pub fn users_feed(&self) -> FeedPager<User> {
        let source = DocumentPageSource::<User>::new(
            self.backend.documents.clone(),
            self.config.collections.users.clone(),
        );
        FeedPager::new(Arc::new(source), FeedQuery::All, self.config.feed.page_size)
    }

    /// Post feeds read through `PostService`, sharing its cache
    fn post_pager(&self, query: FeedQuery) -> FeedPager<Post> {
        FeedPager::new(self.posts.clone(), query, self.config.feed.page_size)
    }
}
