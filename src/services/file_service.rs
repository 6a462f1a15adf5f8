use axum::{
    body::Body,
    http::{HeaderValue, Response, header},
};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    dto::files::{SignedUrlResponse, UploadFileRequest, UploadFileResponse},
    error::{AppError, AppResult},
    files::{
        MAX_FILES_PER_ORDER, decode_file_data, ensure_size, normalize_content_type, storage_key,
        validate_filename,
    },
    gateway::authorize_file,
    middleware::auth::CallerIdentity,
    models::NewOrderFile,
    state::AppState,
};

/// Read an upload body field by field so each missing or malformed field
/// reports its own message.
pub fn parse_upload(payload: &Value) -> AppResult<UploadFileRequest> {
    let order_id = payload
        .get("orderId")
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .ok_or_else(|| AppError::InvalidInput("Invalid order ID".into()))?;
    let filename = payload
        .get("filename")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::InvalidInput("Filename is required".into()))?;
    let file_data = payload
        .get("fileData")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::InvalidInput("File data is required".into()))?;
    let content_type = payload
        .get("contentType")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(UploadFileRequest {
        order_id,
        filename: filename.to_string(),
        file_data: file_data.to_string(),
        content_type,
    })
}

/// Store an upload against an existing order.
///
/// The blob is written first and the metadata row second. If the row cannot
/// be written the blob is deleted again; a failed delete is logged only.
pub async fn attach_file(
    state: &AppState,
    payload: UploadFileRequest,
) -> AppResult<UploadFileResponse> {
    let order = state
        .orders
        .find_order(payload.order_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if state.files.count_files(order.id).await? >= MAX_FILES_PER_ORDER {
        return Err(AppError::TooManyFiles {
            max: MAX_FILES_PER_ORDER,
        });
    }

    validate_filename(&payload.filename)?;
    let bytes = decode_file_data(&payload.file_data)?;
    ensure_size(&bytes)?;

    let key = storage_key(order.id, &payload.filename);
    if state.files.find_file_by_path(&key).await?.is_some() {
        return Err(duplicate_name());
    }
    let content_type = normalize_content_type(payload.content_type.as_deref());

    // a concurrent upload of the same name loses here, before it owns a blob
    // its compensation could delete
    state
        .blobs
        .put(&key, &bytes, &content_type)
        .await
        .map_err(|err| match err {
            AppError::BlobExists(_) => duplicate_name(),
            other => other,
        })?;

    let record = NewOrderFile {
        order_id: order.id,
        filename: payload.filename,
        storage_path: key.clone(),
        content_type,
        size_bytes: bytes.len() as i64,
    };
    if let Err(err) = state.files.insert_file(record).await {
        error!(error = ?err, storage_path = %key, "file metadata insert failed, removing blob");
        if let Err(cleanup) = state.blobs.delete(&key).await {
            warn!(error = ?cleanup, storage_path = %key, "orphaned blob cleanup failed");
        }
        return Err(err);
    }

    info!(storage_path = %key, size = bytes.len(), "file stored");
    Ok(UploadFileResponse {
        success: true,
        storage_path: key,
    })
}

fn duplicate_name() -> AppError {
    AppError::InvalidInput("A file with this name is already attached to the order".into())
}

/// Short-lived download link for a file the caller may read.
pub async fn download_file(
    state: &AppState,
    caller: &CallerIdentity,
    storage_path: &str,
) -> AppResult<SignedUrlResponse> {
    let file = authorize_file(
        state.orders.as_ref(),
        state.files.as_ref(),
        caller,
        storage_path,
    )
    .await?;
    let signed_url = state
        .blobs
        .signed_url(&file.storage_path, state.signed_url_ttl())
        .await?;
    Ok(SignedUrlResponse { signed_url })
}

/// Serve blob bytes for a signed-URL token.
pub async fn serve_blob(state: &AppState, token: &str) -> AppResult<Response<Body>> {
    let key = state.signer.verify(token)?;
    let blob = state.blobs.get(&key).await?.ok_or(AppError::NotFound)?;
    let content_type = HeaderValue::from_str(&blob.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let mut response = Response::new(Body::from(blob.bytes));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    Ok(response)
}
