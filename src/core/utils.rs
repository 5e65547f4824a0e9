use actix_multipart::Field;
use futures_util::TryStreamExt;

use super::AppError;

/// Drain a multipart field, failing once it grows past `limit` bytes.
pub async fn read_field_bytes(field: &mut Field, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {:?}", e);
        AppError::validation_error("Invalid multipart form data")
    })? {
        data.extend_from_slice(&chunk);
        if data.len() > limit {
            return Err(AppError::validation_error(format!(
                "File exceeds the maximum size of {}",
                describe_size(limit)
            )));
        }
    }
    Ok(data)
}

/// Whole units only: `52428800` is "50 MB", `2048` is "2 KB".
pub fn describe_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * 1024;
    if bytes >= MB {
        format!("{} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{} KB", bytes / KB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Text fields are small; anything over 64 KiB is rejected.
pub async fn read_text_field(field: &mut Field, name: &str) -> Result<String, AppError> {
    let data = read_field_bytes(field, 64 * 1024).await?;
    String::from_utf8(data)
        .map_err(|_| AppError::validation_error(format!("Invalid encoding for field '{}'", name)))
}

pub async fn skip_field(field: &mut Field) -> Result<(), AppError> {
    while field
        .try_next()
        .await
        .map_err(|_| AppError::validation_error("Invalid multipart form data"))?
        .is_some()
    {}
    Ok(())
}

/// Keep object keys URL-safe: anything outside `[A-Za-z0-9._-]` becomes `_`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = sanitized.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}
