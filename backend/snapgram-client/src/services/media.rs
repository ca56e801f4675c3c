/// Media service - image upload, preview URLs and blob cleanup
use std::sync::Arc;

use remote_store::{unique_id, BlobStore, FileUpload, PreviewOptions};
use tracing::{debug, error};

use crate::error::Result;
use crate::models::ImageRef;
use crate::validators::validate_upload;

#[derive(Clone)]
pub struct MediaService {
    blobs: Arc<dyn BlobStore>,
    bucket: String,
    preview: PreviewOptions,
}

impl MediaService {
    pub fn new(blobs: Arc<dyn BlobStore>, bucket: impl Into<String>, preview: PreviewOptions) -> Self {
        Self {
            blobs,
            bucket: bucket.into(),
            preview,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload an image and resolve its preview URL
    ///
    /// If the preview cannot be resolved the fresh blob is deleted before the
    /// error is returned, so a failed call never leaves a blob behind.
    pub async fn upload_image(&self, file: FileUpload) -> Result<ImageRef> {
        validate_upload(&file)?;

        let file_name = file.file_name.clone();
        let stored = self
            .blobs
            .upload_file(&self.bucket, &unique_id(), file)
            .await
            .map_err(|e| {
                error!(file_name = %file_name, error = %e, "image upload failed");
                e
            })?;

        match self.blobs.file_preview(&self.bucket, &stored.id, &self.preview) {
            Ok(url) => {
                debug!(file_id = %stored.id, "image uploaded");
                Ok(ImageRef { id: stored.id, url })
            }
            Err(e) => {
                error!(file_id = %stored.id, error = %e, "preview URL unavailable, removing upload");
                self.discard(&stored.id).await;
                Err(e.into())
            }
        }
    }

    pub async fn delete_image(&self, file_id: &str) -> Result<()> {
        self.blobs.delete_file(&self.bucket, file_id).await?;
        debug!(file_id = %file_id, "image deleted");
        Ok(())
    }

    /// Best-effort delete used for compensation; failures are only logged
    pub async fn discard(&self, file_id: &str) {
        if let Err(e) = self.blobs.delete_file(&self.bucket, file_id).await {
            error!(file_id = %file_id, error = %e, "failed to delete orphaned image");
        }
    }
}
