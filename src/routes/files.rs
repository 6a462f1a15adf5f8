use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State, rejection::JsonRejection},
    http::Response,
    routing::{get, post},
};

use serde_json::Value;

use crate::{
    dto::files::{BlobQuery, DownloadRequest, SignedUrlResponse, UploadFileRequest, UploadFileResponse},
    error::{AppError, AppResult},
    middleware::auth::CallerIdentity,
    services::file_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_file))
        .route("/download", post(download_file))
        .route("/blob", get(fetch_blob))
}

#[utoipa::path(
    post,
    path = "/api/files",
    request_body = UploadFileRequest,
    responses(
        (status = 200, description = "File stored", body = UploadFileResponse),
        (status = 400, description = "Invalid file"),
        (status = 404, description = "Unknown order"),
        (status = 500, description = "Storage failure"),
    ),
    tag = "Files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<UploadFileResponse>> {
    let Json(payload) =
        payload.map_err(|_| AppError::InvalidInput("Invalid request body".into()))?;
    let request = file_service::parse_upload(&payload)?;
    let resp = file_service::attach_file(&state, request).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/files/download",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Signed URL valid for five minutes", body = SignedUrlResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(payload): Json<DownloadRequest>,
) -> AppResult<Json<SignedUrlResponse>> {
    let resp = file_service::download_file(&state, &caller, &payload.storage_path).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/files/blob",
    params(("token" = String, Query, description = "Signed URL token")),
    responses(
        (status = 200, description = "File bytes"),
        (status = 401, description = "Invalid or expired token"),
        (status = 404, description = "Not Found"),
    ),
    tag = "Files"
)]
pub async fn fetch_blob(
    State(state): State<AppState>,
    Query(query): Query<BlobQuery>,
) -> AppResult<Response<Body>> {
    file_service::serve_blob(&state, &query.token).await
}
