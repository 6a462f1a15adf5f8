//! Upload rules for order attachments.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const MAX_FILES_PER_ORDER: usize = 10;
pub const MAX_FILENAME_LEN: usize = 255;
pub const ALLOWED_EXTENSIONS: [&str; 8] =
    [".dxf", ".dwg", ".step", ".stp", ".pdf", ".jpg", ".jpeg", ".png"];

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub fn validate_filename(filename: &str) -> AppResult<()> {
    let len = filename.chars().count();
    if len == 0 || len > MAX_FILENAME_LEN {
        return Err(AppError::InvalidFilename("Invalid filename length".into()));
    }
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(AppError::InvalidFilename("Invalid filename characters".into()));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '(' | ')' | ' ');
    if !filename.chars().all(allowed) {
        return Err(AppError::InvalidFilename(
            "Filename contains invalid characters".into(),
        ));
    }
    match extension(filename) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(AppError::InvalidFilename(format!(
            "Invalid file type. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        ))),
    }
}

/// Lower-cased extension including the dot, e.g. `.dxf`.
fn extension(filename: &str) -> Option<String> {
    let idx = filename.rfind('.')?;
    let ext = &filename[idx..];
    (ext.len() > 1).then(|| ext.to_ascii_lowercase())
}

/// Decode a base64 upload, tolerating a `data:<type>;base64,` prefix.
pub fn decode_file_data(file_data: &str) -> AppResult<Vec<u8>> {
    if file_data.is_empty() {
        return Err(AppError::InvalidInput("File data is required".into()));
    }
    let encoded = match file_data.split_once(',') {
        Some((_, data)) => data,
        None => file_data,
    };
    STANDARD
        .decode(encoded.trim())
        .map_err(|_| AppError::InvalidInput("Invalid file data encoding".into()))
}

pub fn ensure_size(bytes: &[u8]) -> AppResult<()> {
    if bytes.len() > MAX_FILE_SIZE {
        return Err(AppError::FileTooLarge {
            max_bytes: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

/// Storage key layout: `orders/{order_id}/{filename}`.
pub fn storage_key(order_id: Uuid, filename: &str) -> String {
    format!("orders/{order_id}/{filename}")
}

/// Owning order id encoded in a storage key, if the key has the expected shape.
pub fn order_id_from_key(key: &str) -> Option<Uuid> {
    let mut parts = key.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("orders"), Some(id), Some(name), None) if !name.is_empty() => {
            Uuid::parse_str(id).ok()
        }
        _ => None,
    }
}

pub fn normalize_content_type(content_type: Option<&str>) -> String {
    match content_type.map(str::trim) {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => DEFAULT_CONTENT_TYPE.to_string(),
    }
}

pub fn content_type_for(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some(".pdf") => "application/pdf",
        Some(".jpg") | Some(".jpeg") => "image/jpeg",
        Some(".png") => "image/png",
        Some(".dxf") => "image/vnd.dxf",
        Some(".dwg") => "image/vnd.dwg",
        Some(".step") | Some(".stp") => "model/step",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
