/// Data models for the Snapgram client
///
/// Stored entities decode straight from remote documents; the input structs
/// carry the form validation rules.
use chrono::{DateTime, Utc};
use remote_store::FileUpload;
use serde::{Deserialize, Serialize};
use validator::Validate;

mod relation;

/// A stored image: blob id and the preview URL derived from it
///
/// The two always travel together so a document never points at a blob it
/// does not also identify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
    pub url: String,
}

/// User profile document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "relation::string_or_null")]
    pub username: String,
    pub email: String,
    #[serde(rename = "imageUrl", default, deserialize_with = "relation::string_or_null")]
    pub image_url: String,
    /// Set only once the user uploads an avatar; signup avatars are generated URLs
    #[serde(rename = "imageId", default)]
    pub image_id: Option<String>,
    #[serde(default, deserialize_with = "relation::string_or_null")]
    pub bio: String,
    /// Save documents, newest last
    #[serde(rename = "save", default, deserialize_with = "relation::ids")]
    pub saves: Vec<String>,
}

/// Post document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    /// Creator user id
    #[serde(deserialize_with = "relation::id")]
    pub creator: String,
    #[serde(default, deserialize_with = "relation::string_or_null")]
    pub caption: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "imageId")]
    pub image_id: String,
    #[serde(default, deserialize_with = "relation::string_or_null")]
    pub location: String,
    #[serde(default, deserialize_with = "relation::ids")]
    pub tags: Vec<String>,
    /// Ids of users who liked the post
    #[serde(default, deserialize_with = "relation::ids")]
    pub likes: Vec<String>,
}

impl Post {
    pub fn image(&self) -> ImageRef {
        ImageRef {
            id: self.image_id.clone(),
            url: self.image_url.clone(),
        }
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }

    /// Like list after `user_id` toggles its like
    pub fn toggle_like(&self, user_id: &str) -> Vec<String> {
        if self.is_liked_by(user_id) {
            self.likes
                .iter()
                .filter(|id| id.as_str() != user_id)
                .cloned()
                .collect()
        } else {
            let mut likes = self.likes.clone();
            likes.push(user_id.to_string());
            likes
        }
    }
}

/// Join document marking a post as saved by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Save {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "relation::id")]
    pub user: String,
    #[serde(deserialize_with = "relation::id")]
    pub post: String,
}

/// Sign-up form
#[derive(Debug, Clone, Validate)]
pub struct NewUser {
    #[validate(length(min = 2, max = 50, message = "Name must be 2 to 50 characters"))]
    pub name: String,
    #[validate(length(min = 2, message = "Username is too short"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Sign-in form
#[derive(Debug, Clone, Validate)]
pub struct SignIn {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Post authoring form
#[derive(Debug, Clone, Validate)]
pub struct NewPost {
    pub user_id: String,
    #[validate(length(min = 5, max = 2200, message = "Caption must be 5 to 2200 characters"))]
    pub caption: String,
    pub file: FileUpload,
    #[validate(length(min = 2, max = 100, message = "Location must be 2 to 100 characters"))]
    pub location: String,
    /// Comma-separated tags
    #[validate(length(max = 2200, message = "Tags are too long"))]
    pub tags: String,
}

/// Post edit form; `file` replaces the current image when present
#[derive(Debug, Clone, Validate)]
pub struct UpdatePost {
    pub post_id: String,
    #[validate(length(min = 5, max = 2200, message = "Caption must be 5 to 2200 characters"))]
    pub caption: String,
    /// Current image
    pub image: ImageRef,
    pub file: Option<FileUpload>,
    #[validate(length(min = 2, max = 100, message = "Location must be 2 to 100 characters"))]
    pub location: String,
    #[validate(length(max = 2200, message = "Tags are too long"))]
    pub tags: String,
}

/// Profile edit form; `file` replaces the current avatar when present
#[derive(Debug, Clone, Validate)]
pub struct UpdateUser {
    pub user_id: String,
    #[validate(length(min = 2, message = "Name is too short"))]
    pub name: String,
    #[validate(length(min = 2, message = "Username is too short"))]
    pub username: String,
    #[validate(length(max = 2200, message = "Bio is too long"))]
    pub bio: String,
    pub image_url: String,
    /// Current avatar blob, if the avatar was uploaded rather than generated
    pub image_id: Option<String>,
    pub file: Option<FileUpload>,
}
