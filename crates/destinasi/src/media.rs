//! Image CDN integration.
//!
//! [`ImageService`] is the seam between the application and the CDN. The
//! production implementation forwards to [`ImageKit`] and logs every outcome;
//! tests substitute an in-memory fake. The rest of this module holds the
//! pure helpers built on top: named size presets, responsive `srcset`
//! strings, and pHash similarity levels.

use std::str::FromStr;

use async_trait::async_trait;
use destinasi_imagekit::{
    AuthenticationParameters, ImageKit, ListFilesOptions, Transformation, UploadRequest,
    UploadedFile, UrlOptions,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::models::Destination;

/// Folder that destination images are uploaded into.
pub const DESTINATION_FOLDER: &str = "/destinations";

/// Tags attached to uploaded destination images.
pub const DESTINATION_TAGS: [&str; 2] = ["destination", "thumbnail"];

/// Folder for generic uploads through the image API.
pub const UPLOAD_FOLDER: &str = "/uploads";

/// Operations the application needs from the image CDN.
#[async_trait]
pub trait ImageService: Send + Sync + std::fmt::Debug {
    /// Delivery endpoint, e.g. `https://ik.imagekit.io/demo`.
    fn url_endpoint(&self) -> &str;

    /// Public key for client-side uploads.
    fn public_key(&self) -> &str;

    /// Build a delivery URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the options cannot produce a URL.
    fn url(&self, options: &UrlOptions) -> destinasi_imagekit::Result<String>;

    /// Parameters for a client-side upload.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    fn authentication_parameters(
        &self,
        token: Option<&str>,
        expire: Option<i64>,
    ) -> destinasi_imagekit::Result<AuthenticationParameters>;

    /// Hamming distance between two pHash values.
    ///
    /// # Errors
    ///
    /// Returns an error if either hash is malformed.
    fn phash_distance(&self, first: &str, second: &str) -> destinasi_imagekit::Result<u32>;

    /// Upload a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the CDN call fails.
    async fn upload(&self, request: UploadRequest) -> destinasi_imagekit::Result<UploadedFile>;

    /// Delete a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the CDN call fails.
    async fn delete_file(&self, file_id: &str) -> destinasi_imagekit::Result<()>;

    /// Fetch file metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the CDN call fails.
    async fn file_details(&self, file_id: &str) -> destinasi_imagekit::Result<serde_json::Value>;

    /// Update file metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the CDN call fails.
    async fn update_file_details(
        &self,
        file_id: &str,
        update: &serde_json::Value,
    ) -> destinasi_imagekit::Result<serde_json::Value>;

    /// List files.
    ///
    /// # Errors
    ///
    /// Returns an error if the CDN call fails.
    async fn list_files(
        &self,
        options: &ListFilesOptions,
    ) -> destinasi_imagekit::Result<serde_json::Value>;
}

#[async_trait]
impl ImageService for ImageKit {
    fn url_endpoint(&self) -> &str {
        ImageKit::url_endpoint(self)
    }

    fn public_key(&self) -> &str {
        ImageKit::public_key(self)
    }

    fn url(&self, options: &UrlOptions) -> destinasi_imagekit::Result<String> {
        ImageKit::url(self, options).inspect_err(|e| {
            error!(path = %options.path, error = %e, "ImageKit URL generation failed");
        })
    }

    fn authentication_parameters(
        &self,
        token: Option<&str>,
        expire: Option<i64>,
    ) -> destinasi_imagekit::Result<AuthenticationParameters> {
        ImageKit::authentication_parameters(self, token, expire).inspect_err(|e| {
            error!(error = %e, "ImageKit authentication parameters failed");
        })
    }

    fn phash_distance(&self, first: &str, second: &str) -> destinasi_imagekit::Result<u32> {
        ImageKit::phash_distance(self, first, second).inspect_err(|e| {
            warn!(error = %e, "pHash distance calculation failed");
        })
    }

    async fn upload(&self, request: UploadRequest) -> destinasi_imagekit::Result<UploadedFile> {
        let file_name = request.file_name.clone();
        let folder = request.folder.clone().unwrap_or_default();
        match ImageKit::upload(self, request).await {
            Ok(uploaded) => {
                info!(
                    file_id = %uploaded.file_id,
                    url = %uploaded.url,
                    "ImageKit upload succeeded"
                );
                Ok(uploaded)
            }
            Err(e) => {
                error!(file_name = %file_name, folder = %folder, error = %e, "ImageKit upload failed");
                Err(e)
            }
        }
    }

    async fn delete_file(&self, file_id: &str) -> destinasi_imagekit::Result<()> {
        match ImageKit::delete_file(self, file_id).await {
            Ok(()) => {
                info!(file_id, "ImageKit file deleted");
                Ok(())
            }
            Err(e) => {
                error!(file_id, error = %e, "ImageKit delete failed");
                Err(e)
            }
        }
    }

    async fn file_details(&self, file_id: &str) -> destinasi_imagekit::Result<serde_json::Value> {
        ImageKit::file_details(self, file_id).await.inspect_err(|e| {
            error!(file_id, error = %e, "ImageKit file details failed");
        })
    }

    async fn update_file_details(
        &self,
        file_id: &str,
        update: &serde_json::Value,
    ) -> destinasi_imagekit::Result<serde_json::Value> {
        ImageKit::update_file_details(self, file_id, update)
            .await
            .inspect_err(|e| {
                error!(file_id, error = %e, "ImageKit file update failed");
            })
    }

    async fn list_files(
        &self,
        options: &ListFilesOptions,
    ) -> destinasi_imagekit::Result<serde_json::Value> {
        ImageKit::list_files(self, options).await.inspect_err(|e| {
            error!(error = %e, "ImageKit list files failed");
        })
    }
}

/// Named delivery sizes for destination images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePreset {
    /// 400x300.
    Thumbnail,
    /// 800x600.
    Medium,
    /// 1200x800.
    Large,
    /// 1200x600 banner.
    Hero,
    /// No transformation.
    Original,
}

impl ImagePreset {
    /// The transformation chain for this preset.
    #[must_use]
    pub fn transformations(&self) -> Vec<Transformation> {
        match self {
            Self::Thumbnail => vec![Transformation::resize(400, 300, 100)],
            Self::Medium => vec![Transformation::resize(800, 600, 100)],
            Self::Large => vec![Transformation::resize(1200, 800, 100)],
            Self::Hero => vec![Transformation::resize(1200, 600, 100)],
            Self::Original => Vec::new(),
        }
    }
}

impl FromStr for ImagePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thumbnail" => Ok(Self::Thumbnail),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            "hero" => Ok(Self::Hero),
            "original" => Ok(Self::Original),
            other => Err(format!("unknown image preset: {other}")),
        }
    }
}

/// The path of `image_url` under `endpoint`, if it is served from there.
#[must_use]
pub fn cdn_path<'a>(endpoint: &str, image_url: &'a str) -> Option<&'a str> {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.is_empty() {
        return None;
    }
    let rest = image_url.strip_prefix(endpoint)?;
    let path = rest.split(['?', '#']).next().unwrap_or(rest);
    if path.starts_with('/') && path.len() > 1 {
        Some(path)
    } else {
        None
    }
}

/// Apply a preset to an image URL.
///
/// URLs not served from the CDN endpoint, and the `original` preset, come
/// back unchanged. So does the URL when building the variant fails.
#[must_use]
pub fn optimized_url(images: &dyn ImageService, image_url: &str, preset: ImagePreset) -> String {
    if preset == ImagePreset::Original {
        return image_url.to_string();
    }
    let Some(path) = cdn_path(images.url_endpoint(), image_url) else {
        return image_url.to_string();
    };
    let options = UrlOptions::new(path).with_transformations(preset.transformations());
    images
        .url(&options)
        .unwrap_or_else(|_| image_url.to_string())
}

/// A responsive `srcset` value at 400, 800 and 1200 pixels wide.
///
/// URLs not served from the CDN come back unchanged.
#[must_use]
pub fn srcset(images: &dyn ImageService, image_url: &str) -> String {
    let Some(path) = cdn_path(images.url_endpoint(), image_url) else {
        return image_url.to_string();
    };
    [400, 800, 1200]
        .iter()
        .filter_map(|&width| {
            let options = UrlOptions::new(path)
                .with_transformations(vec![Transformation::width(width, 100)]);
            images
                .url(&options)
                .ok()
                .map(|url| format!("{url} {width}w"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fill in `image_url` with the medium preset of each destination's image.
///
/// Without an image service the original URL is used as is.
pub fn attach_image_urls(images: Option<&dyn ImageService>, destinations: &mut [Destination]) {
    for destination in destinations {
        destination.image_url = destination.thumb_image.as_deref().map(|url| match images {
            Some(images) => optimized_url(images, url, ImagePreset::Medium),
            None => url.to_string(),
        });
    }
}

/// How alike two images are, from their pHash distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityLevel {
    /// Distance 0.
    Identical,
    /// Distance 1 to 10.
    VerySimilar,
    /// Distance 11 to 20.
    Similar,
    /// Anything further apart.
    Different,
}

impl SimilarityLevel {
    /// Classify a Hamming distance.
    #[must_use]
    pub fn from_distance(distance: u32) -> Self {
        match distance {
            0 => Self::Identical,
            1..=10 => Self::VerySimilar,
            11..=20 => Self::Similar,
            _ => Self::Different,
        }
    }
}
