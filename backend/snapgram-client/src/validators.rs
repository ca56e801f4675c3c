use remote_store::FileUpload;
use validator::ValidationError;

use crate::error::{AppError, Result};

/// Image formats accepted by the uploaders
pub const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/jpg", "image/svg+xml"];

/// Split free-text tags into a tag list
///
/// All spaces are removed before splitting on commas, so `"art, summer trip"`
/// yields `["art", "summertrip"]`. Empty fragments are dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.replace(' ', "")
        .split(',')
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// validator crate compatible check for a non-empty, supported image
pub fn validate_image(file: &FileUpload) -> std::result::Result<(), ValidationError> {
    if file.is_empty() {
        let mut err = ValidationError::new("empty_file");
        err.message = Some("File is empty".into());
        return Err(err);
    }

    let content_type = file.content_type.to_ascii_lowercase();
    if !ACCEPTED_IMAGE_TYPES.contains(&content_type.as_str()) {
        let mut err = ValidationError::new("unsupported_file_type");
        err.message = Some(format!("Unsupported file type '{}'", file.content_type).into());
        return Err(err);
    }

    Ok(())
}

/// Reject an upload before it reaches the blob store
pub fn validate_upload(file: &FileUpload) -> Result<()> {
    validate_image(file).map_err(|err| {
        AppError::Validation(
            err.message
                .map(|msg| msg.to_string())
                .unwrap_or_else(|| err.code.to_string()),
        )
    })
}
