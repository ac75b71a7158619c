use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::message::ContentPart;
use crate::error::{PopchatError, Result};

pub const MAX_ATTACHMENTS_PER_MESSAGE: usize = 6;
pub const MAX_ATTACHMENT_DATA_URL_LENGTH: usize = 15 * 1024 * 1024;
pub const MAX_ATTACHMENT_FILE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_FILE_NAME_LENGTH: usize = 120;
const FALLBACK_FILE_NAME: &str = "attachment";

/// A file or image riding along with exactly one outgoing user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    #[serde(default)]
    pub mime_type: String,
    pub data_url: String,
    #[serde(default)]
    pub is_image: bool,
}

impl Attachment {
    pub fn new(file_name: &str, mime_type: &str, data_url: String) -> Self {
        Self {
            file_name: sanitize_attachment_file_name(file_name),
            mime_type: mime_type.to_string(),
            data_url,
            is_image: mime_type.starts_with("image/"),
        }
    }

    /// Reads a file from disk into a base64 data URL.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(FALLBACK_FILE_NAME);

        if fs::metadata(path)?.len() > MAX_ATTACHMENT_FILE_BYTES {
            return Err(PopchatError::AttachmentTooLarge {
                file_name: sanitize_attachment_file_name(file_name),
            });
        }

        let bytes = fs::read(path)?;
        let mime_type = guess_mime_type(path);
        let data_url = format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes)
        );
        Ok(Self::new(file_name, mime_type, data_url))
    }

    pub fn to_content_part(&self) -> ContentPart {
        if self.is_image {
            ContentPart::InputImage {
                image_url: self.data_url.clone(),
            }
        } else {
            ContentPart::InputFile {
                filename: self.file_name.clone(),
                file_data: self.data_url.clone(),
            }
        }
    }
}

pub fn sanitize_attachment_file_name(file_name: &str) -> String {
    let normalized: String = file_name.trim().chars().take(MAX_FILE_NAME_LENGTH).collect();
    let normalized = normalized.trim();
    if normalized.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        normalized.to_string()
    }
}

pub fn validate_attachments(attachments: &[Attachment]) -> Result<()> {
    if attachments.len() > MAX_ATTACHMENTS_PER_MESSAGE {
        return Err(PopchatError::TooManyAttachments {
            count: attachments.len(),
            max: MAX_ATTACHMENTS_PER_MESSAGE,
        });
    }

    for attachment in attachments {
        if attachment.data_url.is_empty()
            || attachment.data_url.len() > MAX_ATTACHMENT_DATA_URL_LENGTH
        {
            return Err(PopchatError::AttachmentTooLarge {
                file_name: attachment.file_name.clone(),
            });
        }
    }

    Ok(())
}

pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        _ => "application/octet-stream",
    }
}
