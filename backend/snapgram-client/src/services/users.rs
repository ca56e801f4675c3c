/// User profiles - listing, lookup and profile edits
use std::sync::Arc;

use remote_store::{DocumentStore, Query, CREATED_AT};
use serde_json::json;
use tracing::{error, info, warn};
use validator::Validate;

use crate::cache::{QueryCache, QueryKey};
use crate::error::{AppError, Result};
use crate::models::{UpdateUser, User};
use crate::services::MediaService;

pub struct UserService {
    documents: Arc<dyn DocumentStore>,
    media: MediaService,
    collection: String,
    default_limit: usize,
    cache: Option<Arc<QueryCache>>,
}

impl UserService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        media: MediaService,
        collection: impl Into<String>,
        default_limit: usize,
    ) -> Self {
        Self {
            documents,
            media,
            collection: collection.into(),
            default_limit,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Newest users first; `None` uses the configured list size
    pub async fn get_users(&self, limit: Option<usize>) -> Result<Vec<User>> {
        let limit = limit.unwrap_or(self.default_limit);
        let key = QueryKey::Users(limit);
        if let Some(cache) = &self.cache {
            if let Some(users) = cache.get::<Vec<User>>(&key).await {
                return Ok(users);
            }
        }

        let users: Vec<User> = self
            .documents
            .list_documents(
                &self.collection,
                &[Query::order_desc(CREATED_AT), Query::limit(limit)],
            )
            .await
            .map_err(|e| {
                warn!(limit, error = %e, "failed to list users");
                e
            })?
            .decode_all()?;

        if let Some(cache) = &self.cache {
            cache.set(&key, &users).await;
        }
        Ok(users)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        if user_id.is_empty() {
            return Ok(None);
        }

        let key = QueryKey::UserById(user_id.to_string());
        if let Some(cache) = &self.cache {
            if let Some(user) = cache.get::<User>(&key).await {
                return Ok(Some(user));
            }
        }

        let user: User = match self.documents.get_document(&self.collection, user_id).await {
            Ok(document) => document.decode()?,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "failed to load user");
                return Err(e.into());
            }
        };

        if let Some(cache) = &self.cache {
            cache.set(&key, &user).await;
        }
        Ok(Some(user))
    }

    /// Update a profile, optionally replacing the avatar
    ///
    /// Same ordering as a post edit: the new avatar is uploaded first and
    /// removed again if the document write fails; the previous avatar blob is
    /// deleted only once the write has succeeded.
    pub async fn update_user(&self, update: UpdateUser) -> Result<User> {
        update.validate()?;
        if update.user_id.is_empty() {
            return Err(AppError::Validation("User id is required".to_string()));
        }

        let replacement = match update.file {
            Some(file) => Some(self.media.upload_image(file).await?),
            None => None,
        };

        let (image_url, image_id) = match &replacement {
            Some(image) => (image.url.clone(), Some(image.id.clone())),
            None => (update.image_url.clone(), update.image_id.clone()),
        };

        let data = json!({
            "name": update.name,
            "username": update.username,
            "bio": update.bio,
            "imageUrl": image_url,
            "imageId": image_id,
        });

        let document = match self
            .documents
            .update_document(&self.collection, &update.user_id, data)
            .await
        {
            Ok(document) => document,
            Err(e) => {
                if let Some(new_image) = &replacement {
                    error!(
                        user_id = %update.user_id,
                        image_id = %new_image.id,
                        error = %e,
                        "profile update failed, removing replacement avatar"
                    );
                    self.media.discard(&new_image.id).await;
                }
                return Err(e.into());
            }
        };

        if let (Some(new_image), Some(old_id)) = (&replacement, &update.image_id) {
            if !old_id.is_empty() && *old_id != new_image.id {
                if let Err(e) = self.media.delete_image(old_id).await {
                    error!(
                        user_id = %update.user_id,
                        image_id = %old_id,
                        error = %e,
                        "failed to delete replaced avatar"
                    );
                }
            }
        }

        if let Some(cache) = &self.cache {
            cache
                .invalidate_many(&[
                    QueryKey::CurrentUser,
                    QueryKey::UserById(update.user_id.clone()),
                ])
                .await;
            cache.invalidate_prefix(&QueryKey::all_user_lists()).await;
        }

        info!(user_id = %update.user_id, "profile updated");
        Ok(document.decode()?)
    }
}
