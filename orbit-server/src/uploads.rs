//! Storage for files attached with `sendMessageWithFile`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::{FileUpload, Media};

const MAX_STORED_NAME_LENGTH: usize = 100;

pub struct UploadStore {
    dir: PathBuf,
    public_prefix: String,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, public_prefix: &str, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decode and write `file`, returning the media descriptor to attach to the message
    pub fn save(&self, file: &FileUpload) -> ApiResult<Media> {
        // Base64 expands 3 bytes into 4 characters
        if file.data.len() / 4 * 3 > self.max_bytes + 3 {
            return Err(ApiError::Upload(format!(
                "File too large (max {} bytes)",
                self.max_bytes
            )));
        }

        let bytes = BASE64
            .decode(file.data.trim())
            .map_err(|e| ApiError::Upload(format!("Invalid file encoding: {}", e)))?;

        if bytes.len() > self.max_bytes {
            return Err(ApiError::Upload(format!(
                "File too large (max {} bytes)",
                self.max_bytes
            )));
        }

        fs::create_dir_all(&self.dir)
            .map_err(|e| ApiError::Upload(format!("Failed to create upload directory: {}", e)))?;

        let stored_name = format!(
            "{}-{}",
            uuid::Uuid::new_v4(),
            sanitize_filename(&file.filename)
        );
        fs::write(self.dir.join(&stored_name), &bytes)
            .map_err(|e| ApiError::Upload(format!("Failed to write file: {}", e)))?;

        info!(file = %stored_name, size = bytes.len(), "Stored upload");

        Ok(Media {
            url: Some(format!("{}/{}", self.public_prefix, stored_name)),
            media_type: Some(media_kind(&file.mimetype).to_string()),
            filename: Some(file.filename.clone()),
            size: Some(bytes.len() as i64),
        })
    }
}

/// Coarse media family from a mimetype
pub fn media_kind(mimetype: &str) -> &'static str {
    let family = mimetype.split('/').next().unwrap_or("").trim();
    match family.to_ascii_lowercase().as_str() {
        "image" => "image",
        "video" => "video",
        "audio" => "audio",
        _ => "file",
    }
}

/// Keep only characters that are safe in a file name on every platform
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STORED_NAME_LENGTH)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}
