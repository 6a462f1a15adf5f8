#![allow(dead_code)]

use std::sync::Arc;

use fab_orders_api::{
    blob_store::{MemoryBlobStore, UrlSigner},
    config::AppConfig,
    dto::files::UploadFileRequest,
    notify::RecordingNotifier,
    services::submission_service,
    state::AppState,
    store::memory::MemoryStore,
};
use serde_json::{Value, json};
use uuid::Uuid;

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness() -> Harness {
    harness_with_notifier(Arc::new(RecordingNotifier::new()))
}

pub fn harness_with_notifier(notifier: Arc<RecordingNotifier>) -> Harness {
    let config = AppConfig::for_tests();
    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::new(UrlSigner::new(
        config.jwt_secret.clone(),
        config.public_base_url.clone(),
    )));
    let state = AppState::new(config, store.clone(), blobs.clone()).with_notifier(notifier.clone());
    Harness {
        state,
        store,
        blobs,
        notifier,
    }
}

pub fn estimate_payload(email: &str) -> Value {
    json!({
        "customer_email": email,
        "request_type": "Estimate",
        "customer_name": "Ann Welder",
        "material": "Mild Steel",
        "thickness": "3/16\"",
        "quantity": "12",
        "notes": "Brackets for a trailer",
    })
}

pub async fn submit(h: &Harness, email: &str) -> Uuid {
    submission_service::submit_order(&h.state, estimate_payload(email))
        .await
        .expect("submission accepted")
        .order_id
}

pub fn upload(order_id: Uuid, filename: &str, bytes: &[u8]) -> UploadFileRequest {
    use base64::Engine;
    UploadFileRequest {
        order_id,
        filename: filename.to_string(),
        file_data: base64::engine::general_purpose::STANDARD.encode(bytes),
        content_type: Some("application/octet-stream".to_string()),
    }
}
