/// Saved posts - the user/post join documents behind the "saved" toggle
use std::sync::Arc;

use remote_store::{unique_id, DocumentStore, Query, CREATED_AT};
use serde_json::json;
use tracing::{debug, warn};

use crate::cache::{QueryCache, QueryKey};
use crate::error::{AppError, Result};
use crate::models::{Post, Save};

pub struct SaveService {
    documents: Arc<dyn DocumentStore>,
    saves_collection: String,
    posts_collection: String,
    cache: Option<Arc<QueryCache>>,
}

impl SaveService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        saves_collection: impl Into<String>,
        posts_collection: impl Into<String>,
    ) -> Self {
        Self {
            documents,
            saves_collection: saves_collection.into(),
            posts_collection: posts_collection.into(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn invalidate(&self, post_id: Option<&str>) {
        if let Some(cache) = &self.cache {
            cache.invalidate(&QueryKey::CurrentUser).await;
            if let Some(post_id) = post_id {
                cache.invalidate(&QueryKey::PostById(post_id.to_string())).await;
            }
            cache.invalidate_prefix(&QueryKey::all_post_lists()).await;
            cache.invalidate_prefix(&QueryKey::all_saved_lists()).await;
        }
    }

    pub async fn save_post(&self, user_id: &str, post_id: &str) -> Result<Save> {
        if user_id.is_empty() || post_id.is_empty() {
            return Err(AppError::Validation(
                "User id and post id are required".to_string(),
            ));
        }

        let document = self
            .documents
            .create_document(
                &self.saves_collection,
                &unique_id(),
                json!({ "user": user_id, "post": post_id }),
            )
            .await?;

        self.invalidate(Some(post_id)).await;
        debug!(save_id = %document.id, user_id = %user_id, post_id = %post_id, "post saved");
        Ok(document.decode()?)
    }

    pub async fn delete_saved_post(&self, save_id: &str) -> Result<()> {
        if save_id.is_empty() {
            return Err(AppError::Validation("Save id is required".to_string()));
        }

        self.documents
            .delete_document(&self.saves_collection, save_id)
            .await?;

        self.invalidate(None).await;
        debug!(save_id = %save_id, "saved post removed");
        Ok(())
    }

    /// The save linking `user_id` to `post_id`, if any
    pub async fn find_save(&self, user_id: &str, post_id: &str) -> Result<Option<Save>> {
        let list = self
            .documents
            .list_documents(
                &self.saves_collection,
                &[
                    Query::equal("user", user_id),
                    Query::equal("post", post_id),
                    Query::limit(1),
                ],
            )
            .await?;

        Ok(list.decode_all::<Save>()?.into_iter().next())
    }

    /// Save the post if it is not saved yet, otherwise remove the save
    ///
    /// Returns whether the post is saved afterwards.
    pub async fn toggle_save(&self, user_id: &str, post_id: &str) -> Result<bool> {
        match self.find_save(user_id, post_id).await? {
            Some(save) => {
                self.delete_saved_post(&save.id).await?;
                Ok(false)
            }
            None => {
                self.save_post(user_id, post_id).await?;
                Ok(true)
            }
        }
    }

    /// Posts saved by `user_id`, most recently saved first
    ///
    /// Saves whose post no longer exists are skipped.
    pub async fn saved_posts(&self, user_id: &str) -> Result<Vec<Post>> {
        let key = QueryKey::SavedPosts(user_id.to_string());
        if let Some(cache) = &self.cache {
            if let Some(posts) = cache.get::<Vec<Post>>(&key).await {
                return Ok(posts);
            }
        }

        let saves: Vec<Save> = self
            .documents
            .list_documents(
                &self.saves_collection,
                &[Query::equal("user", user_id), Query::order_desc(CREATED_AT)],
            )
            .await?
            .decode_all()?;

        let mut posts = Vec::with_capacity(saves.len());
        for save in &saves {
            match self
                .documents
                .get_document(&self.posts_collection, &save.post)
                .await
            {
                Ok(document) => posts.push(document.decode::<Post>()?),
                Err(e) if e.is_not_found() => {
                    warn!(save_id = %save.id, post_id = %save.post, "saved post no longer exists");
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(cache) = &self.cache {
            cache.set(&key, &posts).await;
        }
        Ok(posts)
    }
}
