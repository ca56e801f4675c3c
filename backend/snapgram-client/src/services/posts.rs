/// Post service - authoring, editing, deletion, likes and post queries
use std::sync::Arc;

use async_trait::async_trait;
use remote_store::{unique_id, DocumentStore, Query, CREATED_AT};
use serde_json::json;
use tracing::{error, info, warn};
use validator::Validate;

use crate::cache::{QueryCache, QueryKey};
use crate::error::{AppError, Result};
use crate::feed::{FeedQuery, PageSource};
use crate::models::{NewPost, Post, UpdatePost};
use crate::services::MediaService;
use crate::validators::parse_tags;

pub struct PostService {
    documents: Arc<dyn DocumentStore>,
    media: MediaService,
    collection: String,
    recent_limit: usize,
    page_size: usize,
    cache: Option<Arc<QueryCache>>,
}

impl PostService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        media: MediaService,
        collection: impl Into<String>,
        recent_limit: usize,
        page_size: usize,
    ) -> Self {
        Self {
            documents,
            media,
            collection: collection.into(),
            recent_limit,
            page_size,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn cache(&self) -> Option<&Arc<QueryCache>> {
        self.cache.as_ref()
    }

    /// Create a post: upload the image, then write the document
    ///
    /// A failed document write deletes the uploaded image before the error
    /// is returned.
    pub async fn create_post(&self, post: NewPost) -> Result<Post> {
        post.validate()?;

        let image = self.media.upload_image(post.file).await?;
        let data = json!({
            "creator": post.user_id,
            "caption": post.caption,
            "imageUrl": image.url,
            "imageId": image.id,
            "location": post.location,
            "tags": parse_tags(&post.tags),
        });

        let document = match self
            .documents
            .create_document(&self.collection, &unique_id(), data)
            .await
        {
            Ok(document) => document,
            Err(e) => {
                error!(image_id = %image.id, error = %e, "post write failed, removing uploaded image");
                self.media.discard(&image.id).await;
                return Err(e.into());
            }
        };

        if let Some(cache) = self.cache() {
            cache.invalidate_prefix(&QueryKey::all_post_lists()).await;
        }

        info!(post_id = %document.id, creator = %post.user_id, "post created");
        Ok(document.decode()?)
    }

    /// Update a post, optionally replacing its image
    ///
    /// The new image is uploaded before the document write. If the write
    /// fails the new image is deleted and the old one kept; the old image is
    /// deleted only after the write succeeds.
    pub async fn update_post(&self, update: UpdatePost) -> Result<Post> {
        update.validate()?;
        if update.post_id.is_empty() {
            return Err(AppError::Validation("Post id is required".to_string()));
        }

        let replacement = match update.file {
            Some(file) => Some(self.media.upload_image(file).await?),
            None => None,
        };
        let image = replacement.clone().unwrap_or_else(|| update.image.clone());

        let data = json!({
            "caption": update.caption,
            "imageUrl": image.url,
            "imageId": image.id,
            "location": update.location,
            "tags": parse_tags(&update.tags),
        });

        let document = match self
            .documents
            .update_document(&self.collection, &update.post_id, data)
            .await
        {
            Ok(document) => document,
            Err(e) => {
                if let Some(new_image) = &replacement {
                    error!(
                        post_id = %update.post_id,
                        image_id = %new_image.id,
                        error = %e,
                        "post update failed, removing replacement image"
                    );
                    self.media.discard(&new_image.id).await;
                }
                return Err(AppError::missing(e, format!("post {}", update.post_id)));
            }
        };

        if replacement.is_some() && !update.image.id.is_empty() && update.image.id != image.id {
            if let Err(e) = self.media.delete_image(&update.image.id).await {
                error!(
                    post_id = %update.post_id,
                    image_id = %update.image.id,
                    error = %e,
                    "failed to delete replaced image"
                );
            }
        }

        if let Some(cache) = self.cache() {
            cache.invalidate(&QueryKey::PostById(update.post_id.clone())).await;
            cache.invalidate_prefix(&QueryKey::all_post_lists()).await;
        }

        info!(post_id = %update.post_id, "post updated");
        Ok(document.decode()?)
    }

    /// Delete a post document, then its image
    ///
    /// The image is only touched once the document is gone; the call succeeds
    /// only if both deletions do.
    pub async fn delete_post(&self, post_id: &str, image_id: &str) -> Result<()> {
        if post_id.is_empty() || image_id.is_empty() {
            return Err(AppError::Validation(
                "Post id and image id are required".to_string(),
            ));
        }

        self.documents
            .delete_document(&self.collection, post_id)
            .await
            .map_err(|e| {
                error!(post_id = %post_id, error = %e, "post delete failed");
                AppError::missing(e, format!("post {}", post_id))
            })?;

        if let Some(cache) = self.cache() {
            cache.invalidate(&QueryKey::PostById(post_id.to_string())).await;
            cache.invalidate_prefix(&QueryKey::all_post_lists()).await;
            cache.invalidate_prefix(&QueryKey::all_saved_lists()).await;
        }

        self.media.delete_image(image_id).await.map_err(|e| {
            error!(post_id = %post_id, image_id = %image_id, error = %e, "post image delete failed");
            e
        })?;

        info!(post_id = %post_id, "post deleted");
        Ok(())
    }

    /// Replace the like list of a post
    pub async fn like_post(&self, post_id: &str, likes: Vec<String>) -> Result<Post> {
        let document = self
            .documents
            .update_document(&self.collection, post_id, json!({ "likes": likes }))
            .await?;

        if let Some(cache) = self.cache() {
            cache
                .invalidate_many(&[QueryKey::PostById(post_id.to_string()), QueryKey::CurrentUser])
                .await;
            cache.invalidate_prefix(&QueryKey::all_post_lists()).await;
        }

        Ok(document.decode()?)
    }

    /// Toggle `user_id`'s like on a post
    pub async fn toggle_like(&self, post: &Post, user_id: &str) -> Result<Post> {
        self.like_post(&post.id, post.toggle_like(user_id)).await
    }

    /// Fetch a post; `None` when it does not exist
    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        if post_id.is_empty() {
            return Ok(None);
        }

        let key = QueryKey::PostById(post_id.to_string());
        if let Some(cache) = self.cache() {
            if let Some(post) = cache.get::<Post>(&key).await {
                return Ok(Some(post));
            }
        }

        let post: Post = match self.documents.get_document(&self.collection, post_id).await {
            Ok(document) => document.decode()?,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                warn!(post_id = %post_id, error = %e, "failed to load post");
                return Err(e.into());
            }
        };

        if let Some(cache) = self.cache() {
            cache.set(&key, &post).await;
        }
        Ok(Some(post))
    }

    /// Latest posts, newest first
    pub async fn recent_posts(&self) -> Result<Vec<Post>> {
        let queries = [Query::order_desc(CREATED_AT), Query::limit(self.recent_limit)];
        self.cached_list(QueryKey::RecentPosts, &queries).await
    }

    /// One feed page after `cursor`, newest first
    pub async fn infinite_posts(
        &self,
        query: &FeedQuery,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Post>> {
        let key = QueryKey::InfinitePosts {
            query: query.clone(),
            limit,
            cursor: cursor.map(str::to_string),
        };
        self.cached_list(key, &query.to_queries(cursor, limit)).await
    }

    /// Posts created by `user_id`, newest first
    pub async fn user_posts(&self, user_id: &str) -> Result<Vec<Post>> {
        if user_id.is_empty() {
            return Ok(Vec::new());
        }
        let queries = [
            Query::equal("creator", user_id),
            Query::order_desc(CREATED_AT),
        ];
        self.cached_list(QueryKey::UserPosts(user_id.to_string()), &queries)
            .await
    }

    /// Posts whose caption matches `term`
    pub async fn search_posts(&self, term: &str) -> Result<Vec<Post>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let queries = FeedQuery::Search(term.to_string()).to_queries(None, self.page_size);
        self.cached_list(QueryKey::SearchPosts(term.to_string()), &queries)
            .await
    }

    async fn cached_list(&self, key: QueryKey, queries: &[Query]) -> Result<Vec<Post>> {
        if let Some(cache) = self.cache() {
            if let Some(posts) = cache.get::<Vec<Post>>(&key).await {
                return Ok(posts);
            }
        }

        let list = self
            .documents
            .list_documents(&self.collection, queries)
            .await
            .map_err(|e| {
                warn!(key = %key, error = %e, "post query failed");
                e
            })?;
        let posts: Vec<Post> = list.decode_all()?;

        if let Some(cache) = self.cache() {
            cache.set(&key, &posts).await;
        }
        Ok(posts)
    }
}

/// Post feeds page through the cache, so writes that invalidate post lists
/// also reach the pages a pager loads next
#[async_trait]
impl PageSource<Post> for PostService {
    async fn fetch_page(
        &self,
        query: &FeedQuery,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Post>> {
        self.infinite_posts(query, cursor, limit).await
    }
}
