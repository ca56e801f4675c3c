/// Connection settings for the hosted backend
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// API endpoint including the version prefix, e.g. `https://cloud.appwrite.io/v1`
    pub endpoint: String,
    /// Project the client authenticates against
    pub project_id: String,
    /// Database holding the application collections
    pub database_id: String,
}

impl RemoteConfig {
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        database_id: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            database_id: database_id.into(),
        }
    }

    /// Load from `APPWRITE_URL`, `APPWRITE_PROJECT_ID` and `APPWRITE_DATABASE_ID`
    pub fn from_env() -> StoreResult<Self> {
        let endpoint = std::env::var("APPWRITE_URL")
            .unwrap_or_else(|_| "https://cloud.appwrite.io/v1".to_string());
        let project_id = std::env::var("APPWRITE_PROJECT_ID")
            .map_err(|_| StoreError::Config("APPWRITE_PROJECT_ID must be set".to_string()))?;
        let database_id = std::env::var("APPWRITE_DATABASE_ID")
            .map_err(|_| StoreError::Config("APPWRITE_DATABASE_ID must be set".to_string()))?;

        Ok(Self::new(endpoint, project_id, database_id))
    }

    pub fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint, self.database_id, collection
        )
    }

    pub fn files_url(&self, bucket: &str) -> String {
        format!("{}/storage/buckets/{}/files", self.endpoint, bucket)
    }
}
