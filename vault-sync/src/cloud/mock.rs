//! Mock cloud storage for testing.
//!
//! Keeps files in memory, records uploads and allows injecting failures.

use super::{CloudCredentials, CloudError, CloudStorage, OAuthToken};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory cloud storage.
#[derive(Debug, Default)]
pub struct MockCloudStorage {
    inner: Arc<Mutex<MockCloudInner>>,
}

#[derive(Debug, Default)]
struct MockCloudInner {
    files: HashMap<String, Vec<u8>>,
    uploads: Vec<String>,
    downloads: usize,
    seen_credentials: Vec<CloudCredentials>,
    next_token: Option<OAuthToken>,
    fail_next_exists: Option<String>,
    fail_next_download: Option<String>,
    fail_next_upload: Option<String>,
}

impl MockCloudStorage {
    /// Create an empty mock cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a file in the cloud without recording an upload.
    pub fn put_file(&self, filename: &str, data: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        inner.files.insert(filename.to_string(), data);
    }

    /// Current content of a file.
    pub fn file(&self, filename: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.files.get(filename).cloned()
    }

    /// Names of all uploaded files, in upload order.
    pub fn uploads(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.uploads.clone()
    }

    /// Number of downloads so far.
    pub fn download_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.downloads
    }

    /// Credentials passed to the most recent call.
    pub fn last_credentials(&self) -> Option<CloudCredentials> {
        let inner = self.inner.lock().unwrap();
        inner.seen_credentials.last().cloned()
    }

    /// Token returned by the next `refresh_token()` call.
    pub fn set_refreshed_token(&self, token: OAuthToken) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_token = Some(token);
    }

    /// Cause the next exists() to fail with the given error.
    pub fn fail_next_exists(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_exists = Some(error.to_string());
    }

    /// Cause the next download() to fail with the given error.
    pub fn fail_next_download(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_download = Some(error.to_string());
    }

    /// Cause the next upload() to fail with the given error.
    pub fn fail_next_upload(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_upload = Some(error.to_string());
    }
}

impl Clone for MockCloudStorage {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl CloudStorage for MockCloudStorage {
    async fn exists(
        &self,
        filename: &str,
        credentials: &CloudCredentials,
    ) -> Result<bool, CloudError> {
        let mut inner = self.inner.lock().unwrap();
        inner.seen_credentials.push(credentials.clone());

        if let Some(error) = inner.fail_next_exists.take() {
            return Err(CloudError::Transfer(error));
        }
        Ok(inner.files.contains_key(filename))
    }

    async fn download(
        &self,
        filename: &str,
        credentials: &CloudCredentials,
    ) -> Result<Vec<u8>, CloudError> {
        let mut inner = self.inner.lock().unwrap();
        inner.seen_credentials.push(credentials.clone());

        if let Some(error) = inner.fail_next_download.take() {
            return Err(CloudError::Transfer(error));
        }
        inner.downloads += 1;
        inner
            .files
            .get(filename)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(filename.to_string()))
    }

    async fn upload(
        &self,
        filename: &str,
        data: &[u8],
        credentials: &CloudCredentials,
    ) -> Result<(), CloudError> {
        let mut inner = self.inner.lock().unwrap();
        inner.seen_credentials.push(credentials.clone());

        if let Some(error) = inner.fail_next_upload.take() {
            return Err(CloudError::Transfer(error));
        }
        inner.files.insert(filename.to_string(), data.to_vec());
        inner.uploads.push(filename.to_string());
        Ok(())
    }

    async fn refresh_token(
        &self,
        _credentials: &CloudCredentials,
    ) -> Result<Option<OAuthToken>, CloudError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.next_token.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // MockCloudStorage Tests
    // ===========================================

    #[tokio::test]
    async fn upload_then_download() {
        let cloud = MockCloudStorage::new();
        let credentials = CloudCredentials::new("mock");

        assert!(!cloud.exists("repo", &credentials).await.unwrap());
        cloud.upload("repo", b"data", &credentials).await.unwrap();

        assert!(cloud.exists("repo", &credentials).await.unwrap());
        assert_eq!(cloud.download("repo", &credentials).await.unwrap(), b"data");
        assert_eq!(cloud.uploads(), vec!["repo".to_string()]);
        assert_eq!(cloud.download_count(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let cloud = MockCloudStorage::new();
        let result = cloud.download("nope", &CloudCredentials::new("mock")).await;
        assert!(matches!(result, Err(CloudError::NotFound(_))));
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let cloud = MockCloudStorage::new();
        let credentials = CloudCredentials::new("mock");
        cloud.fail_next_upload("disk full");

        let first = cloud.upload("repo", b"x", &credentials).await;
        assert!(matches!(first, Err(CloudError::Transfer(ref e)) if e == "disk full"));
        cloud.upload("repo", b"x", &credentials).await.unwrap();
    }

    #[tokio::test]
    async fn clones_share_state() {
        let cloud = MockCloudStorage::new();
        let other = cloud.clone();
        cloud.put_file("repo", b"shared".to_vec());
        assert_eq!(other.file("repo").unwrap(), b"shared");
    }
}
