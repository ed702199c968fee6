//! Upload validation shared by the server handlers and the upload client.
//!
//! Runs before any network call: a file that fails here never reaches the
//! object store.

use thiserror::Error;

pub const MAX_FILE_NAME_LEN: usize = 255;

const MB: u64 = 1024 * 1024;

/// Accepted MIME types and their size ceilings.
pub const ALLOWED_TYPES: &[(&str, u64)] = &[
    ("application/pdf", 50 * MB),
    ("application/msword", 25 * MB),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        25 * MB,
    ),
    ("application/vnd.ms-powerpoint", 25 * MB),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        25 * MB,
    ),
    ("text/plain", 5 * MB),
    ("image/jpeg", 10 * MB),
    ("image/png", 10 * MB),
    ("image/webp", 10 * MB),
    ("image/gif", 10 * MB),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file type `{0}` is not allowed")]
    UnsupportedType(String),
    #[error("file is {size} bytes, limit for {content_type} is {limit} bytes")]
    TooLarge {
        content_type: String,
        size: u64,
        limit: u64,
    },
    #[error("file is empty")]
    Empty,
    #[error("file name is empty")]
    EmptyName,
    #[error("file name exceeds 255 characters")]
    NameTooLong,
    #[error("file name contains control characters or path separators")]
    InvalidName,
}

/// Size ceiling for `content_type`, or `None` if the type is not accepted.
pub fn max_size_for(content_type: &str) -> Option<u64> {
    let normalized = normalize_content_type(content_type);
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == normalized)
        .map(|(_, limit)| *limit)
}

/// Lowercase and drop parameters (`text/plain; charset=utf-8` -> `text/plain`).
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() > MAX_FILE_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    if name
        .chars()
        .any(|c| c.is_control() || c == '/' || c == '\\')
    {
        return Err(ValidationError::InvalidName);
    }
    Ok(())
}

pub fn validate_file(name: &str, content_type: &str, size: u64) -> Result<(), ValidationError> {
    validate_file_name(name)?;
    let limit = max_size_for(content_type)
        .ok_or_else(|| ValidationError::UnsupportedType(content_type.to_string()))?;
    if size == 0 {
        return Err(ValidationError::Empty);
    }
    if size > limit {
        return Err(ValidationError::TooLarge {
            content_type: normalize_content_type(content_type),
            size,
            limit,
        });
    }
    Ok(())
}

/// Best-effort MIME guess from a file extension.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
