//! Object-storage key conventions for therapist documents.

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum accepted document size (25 MiB).
pub const MAX_DOCUMENT_BYTES: i64 = 25 * 1024 * 1024;

/// Lifetime of a presigned upload URL.
pub const UPLOAD_URL_EXPIRY_SECS: u64 = 900;

/// Lifetime of a presigned download URL.
pub const DOWNLOAD_URL_EXPIRY_SECS: u64 = 300;

/// Longest file name kept in a storage key.
const MAX_FILE_NAME_LEN: usize = 120;

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`.
///
/// Path separators and other characters become `_`; leading dots are
/// stripped so the key never starts a hidden or relative segment.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let truncated: String = cleaned.chars().take(MAX_FILE_NAME_LEN).collect();
    if truncated.is_empty() {
        "file".to_string()
    } else {
        truncated
    }
}

/// Build the storage key for a new therapist document.
///
/// `unique` is normally a fresh UUID so repeated uploads of the same name
/// never collide.
pub fn document_key(therapist_id: DbId, unique: &str, file_name: &str) -> String {
    format!(
        "therapists/{therapist_id}/documents/{unique}-{}",
        sanitize_file_name(file_name)
    )
}

/// Validate the declared size of an upload.
pub fn validate_document_size(size_bytes: i64) -> Result<(), CoreError> {
    if size_bytes <= 0 {
        return Err(CoreError::Validation(
            "size_bytes must be positive".to_string(),
        ));
    }
    if size_bytes > MAX_DOCUMENT_BYTES {
        return Err(CoreError::Validation(format!(
            "document exceeds the {MAX_DOCUMENT_BYTES} byte limit"
        )));
    }
    Ok(())
}
