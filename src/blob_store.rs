use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, AppResult},
    files::content_type_for,
};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`. An existing key fails with `BlobExists` and is
    /// left untouched.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> AppResult<()>;
    async fn get(&self, key: &str) -> AppResult<Option<StoredBlob>>;
    async fn delete(&self, key: &str) -> AppResult<()>;
    /// Time-limited retrieval URL for `key`.
    async fn signed_url(&self, key: &str, ttl: Duration) -> AppResult<String>;
}

#[derive(Debug, Serialize, Deserialize)]
struct BlobClaims {
    key: String,
    exp: usize,
}

/// Issues and checks the tokens embedded in signed blob URLs.
#[derive(Clone)]
pub struct UrlSigner {
    secret: String,
    base_url: String,
}

impl UrlSigner {
    pub fn new(secret: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn sign(&self, key: &str, ttl: Duration) -> AppResult<String> {
        let expires = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;
        let claims = BlobClaims {
            key: key.to_string(),
            exp: expires.timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;
        Ok(format!("{}/api/files/blob?token={}", self.base_url, token))
    }

    /// Return the storage key a token grants, if it is authentic and unexpired.
    pub fn verify(&self, token: &str) -> AppResult<String> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let decoded = decode::<BlobClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| AppError::Unauthorized)?;
        Ok(decoded.claims.key)
    }
}

/// Reject keys that could escape the storage root.
fn safe_relative(key: &str) -> AppResult<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            _ => return Err(AppError::Blob(format!("Path traversal detected in key {key}"))),
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(AppError::Blob("Empty storage key".into()));
    }
    Ok(relative)
}

/// Blob store on the local filesystem.
#[derive(Clone)]
pub struct FsBlobStore {
    base_path: PathBuf,
    signer: UrlSigner,
}

impl FsBlobStore {
    pub async fn new(base_path: PathBuf, signer: UrlSigner) -> AppResult<Self> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            AppError::Blob(format!(
                "Failed to create blob directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self { base_path, signer })
    }

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        Ok(self.base_path.join(safe_relative(key)?))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Blob(format!("Failed to create '{}': {}", parent.display(), e)))?;
        }
        // create_new makes the existence check and the create a single step
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(AppError::BlobExists(key.to_string()));
            }
            Err(e) => return Err(AppError::Blob(format!("Failed to create blob {key}: {e}"))),
        };
        let written = match file.write_all(bytes).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path).await {
                warn!(error = %cleanup, key = %key, "partial blob cleanup failed");
            }
            return Err(AppError::Blob(format!("Failed to write blob {key}: {e}")));
        }
        debug!(key = %key, size = bytes.len(), "blob stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<StoredBlob>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(StoredBlob {
                bytes,
                content_type: content_type_for(key).to_string(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Blob(format!("Failed to read blob {key}: {e}"))),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Blob(format!("Failed to delete blob {key}: {e}"))),
        }
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> AppResult<String> {
        safe_relative(key)?;
        self.signer.sign(key, ttl)
    }
}

/// Blob store kept in memory, with switches to simulate backend failures.
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, StoredBlob>>,
    signer: UrlSigner,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new(signer: UrlSigner) -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            signer,
            fail_puts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.lock().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.blobs.lock().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> AppResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AppError::Blob("injected put failure".into()));
        }
        let mut blobs = self.blobs.lock().await;
        if blobs.contains_key(key) {
            return Err(AppError::BlobExists(key.to_string()));
        }
        blobs.insert(
            key.to_string(),
            StoredBlob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<StoredBlob>> {
        Ok(self.blobs.lock().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Blob("injected delete failure".into()));
        }
        self.blobs.lock().await.remove(key);
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> AppResult<String> {
        self.signer.sign(key, ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new("blob-secret", "http://localhost:3000/")
    }

    #[test]
    fn signed_token_round_trips_to_key() {
        let url = signer().sign("orders/abc/part.dxf", Duration::minutes(5)).unwrap();
        assert!(url.starts_with("http://localhost:3000/api/files/blob?token="));
        let token = url.split("token=").nth(1).unwrap();
        assert_eq!(signer().verify(token).unwrap(), "orders/abc/part.dxf");
    }

    #[test]
    fn expired_or_foreign_tokens_are_rejected() {
        let url = signer().sign("orders/abc/part.dxf", Duration::seconds(-120)).unwrap();
        let token = url.split("token=").nth(1).unwrap();
        assert!(matches!(signer().verify(token), Err(AppError::Unauthorized)));

        let other = UrlSigner::new("other-secret", "http://localhost:3000");
        let url = other.sign("orders/abc/part.dxf", Duration::minutes(5)).unwrap();
        let token = url.split("token=").nth(1).unwrap();
        assert!(matches!(signer().verify(token), Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn fs_store_writes_reads_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("uploads"), signer()).await.unwrap();

        store.put("orders/1/part.pdf", b"%PDF-1.7", "application/pdf").await.unwrap();
        let blob = store.get("orders/1/part.pdf").await.unwrap().unwrap();
        assert_eq!(blob.bytes, b"%PDF-1.7");
        assert_eq!(blob.content_type, "application/pdf");

        assert!(matches!(
            store.put("orders/1/part.pdf", b"again", "application/pdf").await,
            Err(AppError::BlobExists(_))
        ));
        let kept = store.get("orders/1/part.pdf").await.unwrap().unwrap();
        assert_eq!(kept.bytes, b"%PDF-1.7");

        store.delete("orders/1/part.pdf").await.unwrap();
        assert!(store.get("orders/1/part.pdf").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_puts_of_one_key_store_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(
            FsBlobStore::new(dir.path().to_path_buf(), signer()).await.unwrap(),
        );

        for i in 0..100 {
            let key = format!("orders/o/{i}.pdf");
            let first = {
                let (store, key) = (store.clone(), key.clone());
                tokio::spawn(async move { store.put(&key, b"first", "application/pdf").await })
            };
            let second = {
                let (store, key) = (store.clone(), key.clone());
                tokio::spawn(async move { store.put(&key, b"second", "application/pdf").await })
            };
            let (first, second) = (first.await.unwrap(), second.await.unwrap());

            let stored = store.get(&key).await.unwrap().unwrap();
            match (first, second) {
                (Ok(()), Err(AppError::BlobExists(_))) => assert_eq!(stored.bytes, b"first"),
                (Err(AppError::BlobExists(_)), Ok(())) => assert_eq!(stored.bytes, b"second"),
                other => panic!("round {i}: expected one winner, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn fs_store_refuses_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().to_path_buf(), signer()).await.unwrap();
        assert!(store.put("../escape.pdf", b"x", "application/pdf").await.is_err());
        assert!(store.put("/etc/passwd", b"x", "text/plain").await.is_err());
    }
}
