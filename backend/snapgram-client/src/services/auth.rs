/// Auth service - sign up, sign in, current user and sign out
use std::sync::Arc;

use remote_store::{unique_id, AccountService, DocumentStore, Query, Session, StoreError};
use serde_json::json;
use tracing::{error, info, warn};
use validator::Validate;

use crate::cache::{QueryCache, QueryKey};
use crate::error::{AppError, Result};
use crate::models::{NewUser, SignIn, User};

pub struct AuthService {
    accounts: Arc<dyn AccountService>,
    documents: Arc<dyn DocumentStore>,
    users_collection: String,
    cache: Option<Arc<QueryCache>>,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountService>,
        documents: Arc<dyn DocumentStore>,
        users_collection: impl Into<String>,
    ) -> Self {
        Self {
            accounts,
            documents,
            users_collection: users_collection.into(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Create an account and its profile document
    ///
    /// The profile starts with a generated initials avatar.
    pub async fn sign_up(&self, form: NewUser) -> Result<User> {
        form.validate()?;

        let account = self
            .accounts
            .create_account(&unique_id(), &form.email, &form.password, &form.name)
            .await?;
        let avatar_url = self.accounts.initials_avatar(&account.name);

        let data = json!({
            "accountId": account.id,
            "name": account.name,
            "email": account.email,
            "username": form.username,
            "imageUrl": avatar_url,
        });

        let document = self
            .documents
            .create_document(&self.users_collection, &unique_id(), data)
            .await
            .map_err(|e| {
                // The account cannot be removed from the client side.
                error!(account_id = %account.id, error = %e, "account created but profile write failed");
                e
            })?;

        info!(user_id = %document.id, account_id = %account.id, "user signed up");
        Ok(document.decode()?)
    }

    pub async fn sign_in(&self, form: SignIn) -> Result<Session> {
        form.validate()?;

        let session = self
            .accounts
            .create_email_session(&form.email, &form.password)
            .await
            .map_err(|e| match e {
                StoreError::Unauthorized(msg) => {
                    warn!(error = %msg, "sign in rejected");
                    AppError::Unauthorized("invalid email or password".to_string())
                }
                other => other.into(),
            })?;

        if let Some(cache) = &self.cache {
            cache.invalidate(&QueryKey::CurrentUser).await;
        }

        info!(account_id = %session.user_id, "session created");
        Ok(session)
    }

    /// Profile of the signed-in account; `None` without a session or profile
    pub async fn current_user(&self) -> Result<Option<User>> {
        if let Some(cache) = &self.cache {
            if let Some(user) = cache.get::<User>(&QueryKey::CurrentUser).await {
                return Ok(Some(user));
            }
        }

        let account = match self.accounts.get_account().await {
            Ok(account) => account,
            Err(e) if matches!(e.status_code(), 401 | 404) => return Ok(None),
            Err(e) => {
                warn!(error = %e, "failed to load current account");
                return Err(e.into());
            }
        };

        let list = self
            .documents
            .list_documents(
                &self.users_collection,
                &[Query::equal("accountId", account.id.as_str()), Query::limit(1)],
            )
            .await?;

        let user = match list.decode_all::<User>()?.into_iter().next() {
            Some(user) => user,
            None => {
                warn!(account_id = %account.id, "account has no profile document");
                return Ok(None);
            }
        };

        if let Some(cache) = &self.cache {
            cache.set(&QueryKey::CurrentUser, &user).await;
        }
        Ok(Some(user))
    }

    /// Delete the current session and drop every cached query
    pub async fn sign_out(&self) -> Result<()> {
        self.accounts.delete_session("current").await?;

        if let Some(cache) = &self.cache {
            cache.clear().await;
        }

        info!("signed out");
        Ok(())
    }
}
