//! Object key generation.
//!
//! Two layouts are in use:
//! - presigned / proxy uploads: `{category}/{timestamp}-{randomId}-{sanitizedName}`
//! - legacy resource uploads:   `{category}/{branch}/{semester}/{uniqueId}.{ext}`

use chrono::Utc;
use uuid::Uuid;

const RANDOM_ID_LEN: usize = 8;
const MAX_SANITIZED_NAME_LEN: usize = 128;

/// Replace every character outside `[a-zA-Z0-9._-]` with `_`, collapse runs
/// of underscores and dots so no `..` survives, and trim separators from the
/// ends. Never returns an empty string.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let mapped = match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        };
        if (mapped == '_' || mapped == '.') && out.ends_with(mapped) {
            continue;
        }
        out.push(mapped);
    }

    let trimmed = out.trim_matches(|c| c == '_' || c == '.');
    let mut result: String = trimmed.chars().take(MAX_SANITIZED_NAME_LEN).collect();
    if result.is_empty() {
        result.push_str("file");
    }
    result
}

/// Path segment variant: same alphabet minus dots.
pub fn sanitize_segment(segment: &str) -> String {
    let cleaned = sanitize_file_name(segment).replace('.', "_");
    if cleaned.is_empty() {
        "misc".to_string()
    } else {
        cleaned
    }
}

fn random_id() -> String {
    Uuid::new_v4().simple().to_string()[..RANDOM_ID_LEN].to_string()
}

/// `{category}/{timestamp}-{randomId}-{sanitizedName}`
pub fn generate_file_key(category: &str, file_name: &str) -> String {
    format!(
        "{}/{}-{}-{}",
        sanitize_segment(category),
        Utc::now().timestamp_millis(),
        random_id(),
        sanitize_file_name(file_name)
    )
}

/// `{category}/{branch}/{semester}/{uniqueId}.{ext}`
pub fn generate_resource_key(category: &str, branch: &str, semester: i64, file_name: &str) -> String {
    let ext = file_extension(file_name).unwrap_or_else(|| "bin".to_string());
    format!(
        "{}/{}/{}/{}.{}",
        sanitize_segment(category),
        sanitize_segment(branch),
        semester,
        Uuid::new_v4(),
        ext
    )
}

/// Lowercased extension, restricted to alphanumerics.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
