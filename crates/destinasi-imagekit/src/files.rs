//! Request and response types for the media library endpoints.

use serde::{Deserialize, Serialize};

/// A file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Raw file bytes.
    pub file: Vec<u8>,
    /// Name to store the file under.
    pub file_name: String,
    /// Target folder, e.g. `/destinations`.
    pub folder: Option<String>,
    /// Tags attached to the file.
    pub tags: Vec<String>,
    /// Let ImageKit append a suffix to avoid name collisions.
    pub use_unique_file_name: bool,
    /// Store as a private file (signed URLs required).
    pub is_private_file: bool,
}

impl UploadRequest {
    /// A public upload with a unique file name.
    #[must_use]
    pub fn new(file: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            file,
            file_name: file_name.into(),
            folder: None,
            tags: Vec::new(),
            use_unique_file_name: true,
            is_private_file: false,
        }
    }

    /// Set the target folder.
    #[must_use]
    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Set the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// The subset of ImageKit's upload response the application uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadedFile {
    /// ImageKit file id, needed for deletion and metadata calls.
    pub file_id: String,
    /// Stored file name.
    pub name: String,
    /// Public delivery URL.
    pub url: String,
    /// Thumbnail URL, when ImageKit generated one.
    pub thumbnail_url: Option<String>,
    /// Path inside the media library.
    pub file_path: String,
    /// File size in bytes.
    pub size: u64,
    /// Image height in pixels.
    pub height: Option<u32>,
    /// Image width in pixels.
    pub width: Option<u32>,
    /// `image` or `non-image`.
    pub file_type: String,
}

/// Filters for [`crate::ImageKit::list_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListFilesOptions {
    /// Maximum number of files returned.
    pub limit: Option<u32>,
    /// Number of files to skip.
    pub skip: Option<u32>,
    /// Folder path to list.
    pub path: Option<String>,
}

impl ListFilesOptions {
    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(skip) = self.skip {
            query.push(("skip", skip.to_string()));
        }
        if let Some(path) = &self.path {
            query.push(("path", path.clone()));
        }
        query
    }
}

/// Error body returned by ImageKit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ApiErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_request_builder() {
        let req = UploadRequest::new(vec![1, 2, 3], "a.jpg")
            .in_folder("/destinations")
            .with_tags(["destination", "thumbnail"]);
        assert_eq!(req.folder.as_deref(), Some("/destinations"));
        assert_eq!(req.tags, vec!["destination", "thumbnail"]);
        assert!(req.use_unique_file_name);
        assert!(!req.is_private_file);
    }

    #[test]
    fn test_uploaded_file_deserialize() {
        let json = r#"{
            "fileId": "598821f949c0a938d57563bd",
            "name": "file1.jpg",
            "url": "https://ik.imagekit.io/demo/images/products/file1.jpg",
            "thumbnailUrl": "https://ik.imagekit.io/demo/tr:n-ik_ml_thumbnail/images/products/file1.jpg",
            "height": 300,
            "width": 200,
            "size": 83622,
            "filePath": "/images/products/file1.jpg",
            "fileType": "image",
            "AITags": null
        }"#;
        let file: UploadedFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.file_id, "598821f949c0a938d57563bd");
        assert_eq!(file.width, Some(200));
        assert_eq!(file.size, 83622);
        assert!(file.thumbnail_url.is_some());
    }

    #[test]
    fn test_list_options_query() {
        let opts = ListFilesOptions {
            limit: Some(10),
            skip: None,
            path: Some("/destinations".to_string()),
        };
        assert_eq!(
            opts.to_query(),
            vec![("limit", "10".to_string()), ("path", "/destinations".to_string())]
        );
        assert!(ListFilesOptions::default().to_query().is_empty());
    }
}
