use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;

/// Lifetime of an upload URL handed to the admin panel.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StorageService
///
/// Object storage for media referenced by content records (cover images,
/// project galleries). Implemented by the S3 client and by a mock for tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the bucket if it is missing. Only called for local MinIO setups.
    async fn ensure_bucket_exists(&self);

    /// Signed PUT URL for `key`, constrained to `content_type`.
    async fn presigned_upload_url(&self, key: &str, content_type: &str) -> Result<String, String>;
}

/// S3StorageClient
///
/// AWS SDK client pointed at any S3-compatible endpoint. Path-style addressing
/// is forced for MinIO compatibility.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str, bucket: &str) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            // Already-exists errors land here too.
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket returned an error");
        }
    }

    async fn presigned_upload_url(&self, key: &str, content_type: &str) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(|e| e.to_string())?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(request.uri().to_string())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments from a user-provided key fragment.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// media_key
///
/// `media/<collection>/<uuid>.<ext>`. The extension comes from the original
/// filename (lowercased, alphanumeric only), falling back to `bin`.
pub fn media_key(collection: &str, filename: &str, unique: uuid::Uuid) -> String {
    let collection = sanitize_key(collection).replace('/', "-");
    let collection = if collection.is_empty() {
        "misc".to_string()
    } else {
        collection
    };

    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string());

    format!("media/{collection}/{unique}.{extension}")
}

/// MockStorageService
///
/// Deterministic stand-in for tests and for local runs without MinIO.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every call fails.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn presigned_upload_url(&self, key: &str, _content_type: &str) -> Result<String, String> {
        if self.should_fail {
            return Err("mock storage failure".to_string());
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// Shared handle to the storage service held by the application state.
pub type StorageState = Arc<dyn StorageService>;
