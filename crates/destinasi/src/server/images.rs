//! Image API routes under `/api/imagekit` and `/api/upload`.
//!
//! Responses use the `{"success": ..}` envelope the admin front end expects.
//! A failed upload answers 502 and touches no record; a failed delete
//! answers 200 with `success: false`.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use destinasi_imagekit::{ImageKitError, ListFilesOptions, Transformation, UploadRequest, UrlOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::extract::{CurrentUser, Json, Query};
use super::state::AppState;
use crate::error::{Error, Result};
use crate::media::{
    cdn_path, ImagePreset, ImageService, SimilarityLevel, DESTINATION_FOLDER, DESTINATION_TAGS,
    UPLOAD_FOLDER,
};
use crate::validation::ValidationErrors;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default lifetime of a signed URL in seconds.
pub const DEFAULT_SIGNED_URL_SECONDS: i64 = 300;

/// Longest lifetime of a signed URL in seconds.
pub const MAX_SIGNED_URL_SECONDS: i64 = 86_400;

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn required(errors: &mut ValidationErrors, field: &str, value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.to_string(),
        None => {
            errors.add(
                field,
                format!("The {} field is required.", field.replace('_', " ")),
            );
            String::new()
        }
    }
}

fn in_range(errors: &mut ValidationErrors, field: &str, value: Option<i64>, min: i64, max: i64) {
    if let Some(v) = value {
        if !(min..=max).contains(&v) {
            errors.add(
                field,
                format!(
                    "The {} field must be between {min} and {max}.",
                    field.replace('_', " ")
                ),
            );
        }
    }
}

/// The parts of an upload form.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    filename: Option<String>,
    tags: Vec<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    let mut errors = ValidationErrors::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid("file", format!("The file failed to upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let is_image = field
                    .content_type()
                    .map_or(true, |mime| mime.starts_with("image/"));
                let original = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::invalid("file", format!("The file failed to upload: {e}")))?;
                if !is_image {
                    errors.add("file", "The file field must be an image.");
                } else if bytes.len() > MAX_UPLOAD_BYTES {
                    errors.add(
                        "file",
                        "The file field must not be greater than 10240 kilobytes.",
                    );
                } else if !bytes.is_empty() {
                    form.file = Some((original, bytes.to_vec()));
                }
            }
            "filename" => {
                let text = field.text().await.unwrap_or_default();
                if text.chars().count() > 255 {
                    errors.add(
                        "filename",
                        "The filename field must not be greater than 255 characters.",
                    );
                }
                form.filename = Some(text).filter(|t| !t.trim().is_empty());
            }
            "tags" | "tags[]" => {
                let text = field.text().await.unwrap_or_default();
                form.tags.extend(
                    text.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(ToString::to_string),
                );
            }
            _ => {}
        }
    }

    if form.file.is_none() && !errors.contains("file") {
        errors.add("file", "The file field is required.");
    }
    errors.finish(|| form)
}

/// Upload result returned to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadData {
    /// Delivery URL.
    pub url: String,
    /// CDN file id, sent back on destination create or update.
    pub file_id: String,
    /// Stored file name.
    pub file_name: String,
    /// Thumbnail URL.
    pub thumbnail_url: Option<String>,
}

async fn upload_with(images: &dyn ImageService, request: UploadRequest, message: &str) -> Response {
    match images.upload(request).await {
        Ok(uploaded) => Json(json!({
            "success": true,
            "data": UploadData {
                url: uploaded.url,
                file_id: uploaded.file_id,
                file_name: uploaded.name,
                thumbnail_url: uploaded.thumbnail_url,
            },
        }))
        .into_response(),
        Err(_) => failure(StatusCode::BAD_GATEWAY, message),
    }
}

/// `POST /api/imagekit/upload`
pub async fn upload(
    State(state): State<AppState>,
    _current: CurrentUser,
    multipart: Multipart,
) -> Result<Response> {
    let images = state.require_images()?;
    let form = read_upload(multipart).await?;
    let (original, bytes) = form.file.unwrap_or_default();
    let file_name = form.filename.unwrap_or(original);
    let mut request = UploadRequest::new(bytes, file_name).in_folder(UPLOAD_FOLDER);
    request.tags = form.tags;
    Ok(upload_with(images, request, "Failed to upload file").await)
}

/// `POST /api/upload/destination-image`
pub async fn upload_destination_image(
    State(state): State<AppState>,
    _current: CurrentUser,
    multipart: Multipart,
) -> Result<Response> {
    let images = state.require_images()?;
    let form = read_upload(multipart).await?;
    let (original, bytes) = form.file.unwrap_or_default();
    let file_name = format!("destination_{}_{original}", Utc::now().timestamp());
    let request = UploadRequest::new(bytes, file_name)
        .in_folder(DESTINATION_FOLDER)
        .with_tags(DESTINATION_TAGS);
    Ok(upload_with(images, request, "Failed to upload image").await)
}

/// URL generation payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateUrlRequest {
    /// File path on the CDN.
    pub path: Option<String>,
    /// Transformation chain.
    pub transformations: Vec<Transformation>,
    /// Signed URL lifetime.
    pub expire_seconds: Option<i64>,
}

/// `POST /api/imagekit/generate-url`
pub async fn generate_url(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(request): Json<GenerateUrlRequest>,
) -> Result<Json<Value>> {
    let images = state.require_images()?;
    let mut errors = ValidationErrors::new();
    let path = required(&mut errors, "path", request.path.as_deref());
    errors.finish(|| ())?;

    let url = images.url(&UrlOptions::new(path).with_transformations(request.transformations))?;
    Ok(Json(json!({ "success": true, "url": url })))
}

/// `POST /api/imagekit/generate-signed-url`
pub async fn generate_signed_url(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(request): Json<GenerateUrlRequest>,
) -> Result<Json<Value>> {
    let images = state.require_images()?;
    let mut errors = ValidationErrors::new();
    let path = required(&mut errors, "path", request.path.as_deref());
    in_range(
        &mut errors,
        "expire_seconds",
        request.expire_seconds,
        1,
        MAX_SIGNED_URL_SECONDS,
    );
    errors.finish(|| ())?;

    let expire = request.expire_seconds.unwrap_or(DEFAULT_SIGNED_URL_SECONDS);
    let options = UrlOptions::new(path)
        .with_transformations(request.transformations)
        .signed(Some(expire));
    let url = images.url(&options)?;
    Ok(Json(json!({
        "success": true,
        "signed_url": url,
        "expires_in": expire,
    })))
}

/// `GET /api/imagekit/auth-params`
pub async fn auth_params(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> Result<Json<Value>> {
    let images = state.require_images()?;
    let params = images.authentication_parameters(None, None)?;
    Ok(Json(json!({
        "success": true,
        "auth_params": params,
        "public_key": images.public_key(),
        "url_endpoint": images.url_endpoint(),
    })))
}

/// File id payload or query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileIdRequest {
    /// CDN file id.
    pub file_id: Option<String>,
}

async fn delete_with(
    state: &AppState,
    request: &FileIdRequest,
    messages: (&str, &str),
) -> Result<Json<Value>> {
    let images = state.require_images()?;
    let mut errors = ValidationErrors::new();
    let file_id = required(&mut errors, "file_id", request.file_id.as_deref());
    errors.finish(|| ())?;

    let success = images.delete_file(&file_id).await.is_ok();
    let message = if success { messages.0 } else { messages.1 };
    Ok(Json(json!({ "success": success, "message": message })))
}

/// `DELETE /api/imagekit/delete-file`
pub async fn delete_file(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(request): Json<FileIdRequest>,
) -> Result<Json<Value>> {
    delete_with(
        &state,
        &request,
        ("File deleted successfully", "Failed to delete file"),
    )
    .await
}

/// `DELETE /api/upload/delete-image`
pub async fn delete_image(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(request): Json<FileIdRequest>,
) -> Result<Json<Value>> {
    delete_with(
        &state,
        &request,
        ("Image deleted successfully", "Failed to delete image"),
    )
    .await
}

/// `GET /api/imagekit/file-details?file_id=`
pub async fn file_details(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(request): Query<FileIdRequest>,
) -> Result<Response> {
    let images = state.require_images()?;
    let mut errors = ValidationErrors::new();
    let file_id = required(&mut errors, "file_id", request.file_id.as_deref());
    errors.finish(|| ())?;

    Ok(match images.file_details(&file_id).await {
        Ok(data) => Json(json!({ "success": true, "data": data })).into_response(),
        Err(_) => failure(StatusCode::NOT_FOUND, "File not found or error occurred"),
    })
}

/// File listing query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListFilesQuery {
    /// Maximum number of files.
    pub limit: Option<u32>,
    /// Files to skip.
    pub skip: Option<u32>,
    /// Folder path.
    pub folder: Option<String>,
}

/// `GET /api/imagekit/list-files`
pub async fn list_files(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<ListFilesQuery>,
) -> Result<Response> {
    let images = state.require_images()?;
    let options = ListFilesOptions {
        limit: query.limit,
        skip: query.skip,
        path: query.folder,
    };
    Ok(match images.list_files(&options).await {
        Ok(data) => Json(json!({ "success": true, "data": data })).into_response(),
        Err(_) => failure(StatusCode::BAD_GATEWAY, "Failed to retrieve files"),
    })
}

/// pHash comparison payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhashRequest {
    /// First fingerprint.
    pub hash1: Option<String>,
    /// Second fingerprint.
    pub hash2: Option<String>,
}

/// `POST /api/imagekit/phash-distance`
pub async fn phash_distance(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(request): Json<PhashRequest>,
) -> Result<Json<Value>> {
    let images = state.require_images()?;
    let mut errors = ValidationErrors::new();
    let first = required(&mut errors, "hash1", request.hash1.as_deref());
    let second = required(&mut errors, "hash2", request.hash2.as_deref());
    errors.finish(|| ())?;

    let distance = images
        .phash_distance(&first, &second)
        .map_err(|e| match e {
            ImageKitError::InvalidPhash(_) => Error::invalid(
                "hash1",
                "The hash values must be 16-digit hexadecimal pHash strings.",
            ),
            other => Error::ImageService(other),
        })?;
    Ok(Json(json!({
        "success": true,
        "distance": distance,
        "similarity": SimilarityLevel::from_distance(distance),
    })))
}

/// Optimized URL payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OptimizedUrlRequest {
    /// CDN path, or a full URL under the CDN endpoint.
    pub path: Option<String>,
    /// Width, 1 to 2000.
    pub width: Option<i64>,
    /// Height, 1 to 2000.
    pub height: Option<i64>,
    /// Quality, 1 to 100.
    pub quality: Option<i64>,
    /// Named preset, used when no explicit size is given.
    pub preset: Option<ImagePreset>,
}

/// `POST /api/upload/optimized-url`
pub async fn optimized_url(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(request): Json<OptimizedUrlRequest>,
) -> Result<Json<Value>> {
    let images = state.require_images()?;
    let mut errors = ValidationErrors::new();
    let raw = required(&mut errors, "path", request.path.as_deref());
    in_range(&mut errors, "width", request.width, 1, 2000);
    in_range(&mut errors, "height", request.height, 1, 2000);
    in_range(&mut errors, "quality", request.quality, 1, 100);
    errors.finish(|| ())?;

    let path = cdn_path(images.url_endpoint(), &raw).map_or(raw.clone(), ToString::to_string);
    let to_u32 = |v: Option<i64>| v.and_then(|n| u32::try_from(n).ok());
    let transformations =
        if request.width.is_some() || request.height.is_some() || request.quality.is_some() {
            vec![Transformation {
                width: to_u32(request.width),
                height: to_u32(request.height),
                quality: to_u32(request.quality),
                ..Transformation::default()
            }]
        } else {
            request
                .preset
                .map(|p| p.transformations())
                .unwrap_or_default()
        };

    let url = images.url(&UrlOptions::new(path).with_transformations(transformations))?;
    Ok(Json(json!({ "success": true, "url": url })))
}
