//! ImageKit CDN client for destinasi.
//!
//! A small async client for the parts of the ImageKit API the catalog uses:
//! uploads, media library calls, delivery URL building and signing, upload
//! authentication parameters, and pHash comparison.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod error;
pub mod files;
pub mod phash;
pub mod signature;
pub mod delivery;

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tracing::debug;

pub use error::{ImageKitError, Result};
pub use files::{ListFilesOptions, UploadRequest, UploadedFile};
pub use signature::AuthenticationParameters;
pub use delivery::{parse_http_url, Transformation, TransformationPosition, UrlOptions};

/// Default host for uploads.
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://upload.imagekit.io";

/// Default host for media library calls.
pub const DEFAULT_API_BASE_URL: &str = "https://api.imagekit.io";

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageKitConfig {
    /// Public API key, handed to browsers for direct uploads.
    pub public_key: String,
    /// Private API key. Never leaves the server.
    pub private_key: String,
    /// Delivery endpoint, e.g. `https://ik.imagekit.io/your_id`.
    pub url_endpoint: String,
    /// Base URL of the upload API.
    pub upload_base_url: String,
    /// Base URL of the media library API.
    pub api_base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ImageKitConfig {
    /// Settings against the public ImageKit hosts.
    #[must_use]
    pub fn new(
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        url_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
            url_endpoint: url_endpoint.into(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// ImageKit API client.
#[derive(Debug, Clone)]
pub struct ImageKit {
    config: ImageKitConfig,
    http: Client,
}

impl ImageKit {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns an error if a key or the URL endpoint is empty, or if the
    /// HTTP client cannot be constructed.
    pub fn new(config: ImageKitConfig) -> Result<Self> {
        if config.public_key.trim().is_empty() {
            return Err(ImageKitError::InvalidConfig("public_key is empty".to_string()));
        }
        if config.private_key.trim().is_empty() {
            return Err(ImageKitError::InvalidConfig("private_key is empty".to_string()));
        }
        if config.url_endpoint.trim().is_empty() {
            return Err(ImageKitError::InvalidConfig("url_endpoint is empty".to_string()));
        }
        parse_http_url(&config.url_endpoint)
            .map_err(|e| ImageKitError::InvalidConfig(format!("url_endpoint: {e}")))?;
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    /// The public key.
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.config.public_key
    }

    /// The delivery endpoint.
    #[must_use]
    pub fn url_endpoint(&self) -> &str {
        &self.config.url_endpoint
    }

    /// Build a delivery URL, signed when `options.signed` is set.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty path, a non-positive expiry, or a
    /// signing failure.
    pub fn url(&self, options: &UrlOptions) -> Result<String> {
        delivery::build_url(
            &self.config.url_endpoint,
            &self.config.private_key,
            options,
            chrono::Utc::now().timestamp(),
        )
    }

    /// Parameters for a client-side upload.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn authentication_parameters(
        &self,
        token: Option<&str>,
        expire: Option<i64>,
    ) -> Result<AuthenticationParameters> {
        signature::authentication_parameters(
            &self.config.private_key,
            token,
            expire,
            chrono::Utc::now().timestamp(),
        )
    }

    /// Upload a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or ImageKit rejects the upload.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadedFile> {
        let endpoint = format!(
            "{}/api/v1/files/upload",
            self.config.upload_base_url.trim_end_matches('/')
        );
        debug!(file_name = %request.file_name, bytes = request.file.len(), "uploading to ImageKit");

        let part = Part::bytes(request.file).file_name(request.file_name.clone());
        let mut form = Form::new()
            .part("file", part)
            .text("fileName", request.file_name)
            .text("useUniqueFileName", request.use_unique_file_name.to_string())
            .text("isPrivateFile", request.is_private_file.to_string());
        if let Some(folder) = request.folder {
            form = form.text("folder", folder);
        }
        if !request.tags.is_empty() {
            form = form.text("tags", request.tags.join(","));
        }

        let response = self
            .http
            .post(endpoint)
            .basic_auth(&self.config.private_key, Some(""))
            .multipart(form)
            .send()
            .await?;
        let body = check(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Delete a file by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or ImageKit refuses the delete.
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        let endpoint = self.file_endpoint(file_id, "")?;
        let response = self
            .http
            .delete(endpoint)
            .basic_auth(&self.config.private_key, Some(""))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Fetch file metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the file does not exist.
    pub async fn file_details(&self, file_id: &str) -> Result<serde_json::Value> {
        let endpoint = self.file_endpoint(file_id, "/details")?;
        let response = self
            .http
            .get(endpoint)
            .basic_auth(&self.config.private_key, Some(""))
            .send()
            .await?;
        let body = check(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Update file metadata such as tags or custom coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or ImageKit rejects the update.
    pub async fn update_file_details(
        &self,
        file_id: &str,
        update: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let endpoint = self.file_endpoint(file_id, "/details")?;
        let response = self
            .http
            .patch(endpoint)
            .basic_auth(&self.config.private_key, Some(""))
            .json(update)
            .send()
            .await?;
        let body = check(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// List files in the media library.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_files(&self, options: &ListFilesOptions) -> Result<serde_json::Value> {
        let endpoint = format!("{}/v1/files", self.config.api_base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(endpoint)
            .basic_auth(&self.config.private_key, Some(""))
            .query(&options.to_query())
            .send()
            .await?;
        let body = check(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Hamming distance between two pHash values.
    ///
    /// # Errors
    ///
    /// Returns an error if either hash is malformed.
    pub fn phash_distance(&self, first: &str, second: &str) -> Result<u32> {
        phash::phash_distance(first, second)
    }

    fn file_endpoint(&self, file_id: &str, suffix: &str) -> Result<String> {
        if file_id.trim().is_empty() || file_id.contains('/') {
            return Err(ImageKitError::Url(format!("invalid file id: {file_id:?}")));
        }
        Ok(format!(
            "{}/v1/files/{file_id}{suffix}",
            self.config.api_base_url.trim_end_matches('/')
        ))
    }
}

/// Turn a non-success response into [`ImageKitError::Api`].
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<files::ApiErrorBody>(&text)
        .ok()
        .map(|body| body.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    Err(ImageKitError::api(status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;
    use serde_json::json;

    fn client_for(server: &MockServer) -> ImageKit {
        let mut config = ImageKitConfig::new("public_k", "private_k", "https://ik.imagekit.io/demo");
        config.upload_base_url = server.base_url();
        config.api_base_url = server.base_url();
        ImageKit::new(config).unwrap()
    }

    #[test]
    fn test_new_rejects_empty_keys() {
        let config = ImageKitConfig::new("", "private", "https://ik.imagekit.io/demo");
        assert!(matches!(
            ImageKit::new(config),
            Err(ImageKitError::InvalidConfig(_))
        ));

        let config = ImageKitConfig::new("public", "private", "");
        assert!(ImageKit::new(config).is_err());
        let config = ImageKitConfig::new("public", "private", "https://");
        assert!(matches!(
            ImageKit::new(config),
            Err(ImageKitError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config = ImageKitConfig::new("a", "b", "c");
        assert_eq!(config.upload_base_url, DEFAULT_UPLOAD_BASE_URL);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_url_uses_endpoint() {
        let client = ImageKit::new(ImageKitConfig::new("a", "b", "https://ik.imagekit.io/demo"))
            .unwrap();
        let url = client.url(&UrlOptions::new("/x.png")).unwrap();
        assert_eq!(url, "https://ik.imagekit.io/demo/x.png");
    }

    #[tokio::test]
    async fn test_upload_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/files/upload")
                    .header_exists("authorization")
                    .body_contains("destination_1.jpg")
                    .body_contains("/destinations");
                then.status(200).json_body(json!({
                    "fileId": "file_123",
                    "name": "destination_1_abc.jpg",
                    "url": "https://ik.imagekit.io/demo/destinations/destination_1_abc.jpg",
                    "filePath": "/destinations/destination_1_abc.jpg",
                    "size": 3,
                    "fileType": "image"
                }));
            })
            .await;

        let client = client_for(&server);
        let request = UploadRequest::new(vec![1, 2, 3], "destination_1.jpg")
            .in_folder("/destinations")
            .with_tags(["destination", "thumbnail"]);
        let uploaded = client.upload(request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(uploaded.file_id, "file_123");
        assert_eq!(uploaded.file_path, "/destinations/destination_1_abc.jpg");
    }

    #[tokio::test]
    async fn test_upload_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/files/upload");
                then.status(400).json_body(json!({
                    "message": "Your request contains invalid fileName parameter.",
                    "help": "For support kindly contact us at support@imagekit.io ."
                }));
            })
            .await;

        let client = client_for(&server);
        let err = client
            .upload(UploadRequest::new(vec![0], "bad"))
            .await
            .unwrap_err();
        match err {
            ImageKitError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("invalid fileName"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_delete_file() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/v1/files/file_123");
                then.status(204);
            })
            .await;

        let client = client_for(&server);
        client.delete_file("file_123").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_missing_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/v1/files/missing");
                then.status(404)
                    .json_body(json!({"message": "The requested file does not exist."}));
            })
            .await;

        let client = client_for(&server);
        let err = client.delete_file("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_rejects_path_like_id() {
        let server = MockServer::start_async().await;
        let client = client_for(&server);
        assert!(matches!(
            client.delete_file("../purge").await,
            Err(ImageKitError::Url(_))
        ));
    }

    #[tokio::test]
    async fn test_file_details() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/files/file_123/details");
                then.status(200)
                    .json_body(json!({"fileId": "file_123", "name": "a.jpg"}));
            })
            .await;

        let client = client_for(&server);
        let details = client.file_details("file_123").await.unwrap();
        assert_eq!(details["name"], "a.jpg");
    }

    #[tokio::test]
    async fn test_update_file_details() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/v1/files/file_123/details")
                    .json_body(json!({"tags": ["hero"]}));
                then.status(200)
                    .json_body(json!({"fileId": "file_123", "tags": ["hero"]}));
            })
            .await;

        let client = client_for(&server);
        let updated = client
            .update_file_details("file_123", &json!({"tags": ["hero"]}))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(updated["tags"][0], "hero");
    }

    #[tokio::test]
    async fn test_list_files_passes_filters() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/files")
                    .query_param("limit", "5")
                    .query_param("path", "/destinations");
                then.status(200)
                    .json_body(json!([{"fileId": "a"}, {"fileId": "b"}]));
            })
            .await;

        let client = client_for(&server);
        let files = client
            .list_files(&ListFilesOptions {
                limit: Some(5),
                skip: None,
                path: Some("/destinations".to_string()),
            })
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(files.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_error_without_json_body_uses_status_reason() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/files");
                then.status(503).body("upstream down");
            })
            .await;

        let client = client_for(&server);
        let err = client
            .list_files(&ListFilesOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn test_authentication_parameters_signed_with_private_key() {
        let client = ImageKit::new(ImageKitConfig::new("a", "private_k", "https://x.io/y"))
            .unwrap();
        let params = client
            .authentication_parameters(Some("tok"), Some(1_800_000_000))
            .unwrap();
        assert_eq!(
            params.signature,
            signature::hmac_sha1_hex("private_k", "tok1800000000").unwrap()
        );
    }
}
