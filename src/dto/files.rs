use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileRequest {
    pub order_id: Uuid,
    pub filename: String,
    /// Base64 bytes, optionally as a `data:` URL.
    pub file_data: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileResponse {
    pub success: bool,
    pub storage_path: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DownloadRequest {
    pub storage_path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlResponse {
    pub signed_url: String,
}

#[derive(Debug, Deserialize)]
pub struct BlobQuery {
    pub token: String,
}
