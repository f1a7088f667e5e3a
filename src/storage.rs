use async_trait::async_trait;
use aws_sdk_s3 as s3;
use chrono::Utc;
use s3::primitives::ByteStream;
use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("empty file")]
    EmptyFile,
}

// 1. StorageService Contract
/// StorageService
///
/// Abstract contract for the object storage bucket that holds uploaded cover
/// images. Handlers and mutations only see this trait, so the S3 client can be
/// swapped for `MockStorageService` in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Only used for the local MinIO setup.
    async fn ensure_bucket_exists(&self);

    /// Stores `bytes` under `key` and returns the object's public URL.
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;

    /// Public URL an object stored under `key` is served from.
    fn public_url(&self, key: &str) -> String;
}

// 2. The Real Implementation (S3/MinIO/Supabase)
/// S3StorageClient
///
/// Uses the AWS SDK against any S3-compatible endpoint: MinIO locally, the
/// Supabase Storage S3 gateway in production.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_base: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_base: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // MinIO and the Supabase gateway only understand path-style addressing.
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails harmlessly when the bucket is already there.
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyFile);
        }

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base, self.bucket_name, key)
    }
}

/// sanitize_key
///
/// Removes directory navigation (`..`, `.`, empty segments) from a key so a
/// user-supplied file name cannot escape its folder.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// object_key
///
/// Builds `<folder>/<unix-millis>-<name>` for an uploaded file. Spaces in the
/// original name become `-`; any path components are dropped.
pub fn object_key(folder: &str, file_name: &str) -> String {
    let base = sanitize_key(file_name)
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .replace(' ', "-");
    let base = if base.is_empty() { "upload".to_string() } else { base };
    format!(
        "{}/{}-{}",
        sanitize_key(folder),
        Utc::now().timestamp_millis(),
        base
    )
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// In-memory `StorageService`. Records every stored key; when `should_fail` is
/// set every upload returns a simulated failure.
#[derive(Default)]
pub struct MockStorageService {
    should_fail: AtomicBool,
    stored: RwLock<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        let storage = Self::default();
        storage.set_failing(true);
        storage
    }

    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::SeqCst);
    }

    /// Keys uploaded so far, in order.
    pub fn stored_keys(&self) -> Vec<String> {
        self.stored
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn upload(
        &self,
        key: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StorageError::Upload(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        if bytes.is_empty() {
            return Err(StorageError::EmptyFile);
        }

        let key = sanitize_key(key);
        self.stored
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key.clone());
        Ok(self.public_url(&key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("http://localhost:9000/mock-bucket/{}", key)
    }
}

/// StorageState
///
/// The concrete type used to share storage access across the application state.
pub type StorageState = Arc<dyn StorageService>;
