//! Delivery URL construction.
//!
//! ImageKit serves transformed images from URLs of the form
//! `{url_endpoint}/tr:w-400,h-300/{path}`. Several transformation steps are
//! chained with `:`. Signed URLs carry an `ik-s` HMAC and, when they expire,
//! an `ik-t` unix timestamp.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ImageKitError, Result};
use crate::signature::hmac_sha1_hex;

/// Expiry used in the signature when a signed URL never expires.
pub const NO_EXPIRY_TIMESTAMP: i64 = 9_999_999_999;

/// One transformation step.
///
/// Fields map onto ImageKit's short parameter names. Anything without a
/// dedicated field can go through `extra` as `name -> value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Transformation {
    /// Output width (`w`).
    pub width: Option<u32>,
    /// Output height (`h`).
    pub height: Option<u32>,
    /// Aspect ratio such as `4-3` (`ar`).
    pub aspect_ratio: Option<String>,
    /// Quality 1-100 (`q`).
    pub quality: Option<u32>,
    /// Crop strategy, e.g. `maintain_ratio` (`c`).
    pub crop: Option<String>,
    /// Crop mode, e.g. `pad_resize` (`cm`).
    pub crop_mode: Option<String>,
    /// Focus area (`fo`).
    pub focus: Option<String>,
    /// Output format (`f`).
    pub format: Option<String>,
    /// Rotation in degrees (`rt`).
    pub rotation: Option<i32>,
    /// Gaussian blur radius (`bl`).
    pub blur: Option<u32>,
    /// Raw parameters appended after the typed ones.
    pub extra: BTreeMap<String, String>,
}

impl Transformation {
    /// A resize step keeping the aspect ratio.
    #[must_use]
    pub fn resize(width: u32, height: u32, quality: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            quality: Some(quality),
            crop: Some("maintain_ratio".to_string()),
            ..Self::default()
        }
    }

    /// A width-only step, used for responsive `srcset` entries.
    #[must_use]
    pub fn width(width: u32, quality: u32) -> Self {
        Self {
            width: Some(width),
            quality: Some(quality),
            ..Self::default()
        }
    }

    /// Whether the step carries no parameters at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_params().is_empty()
    }

    /// Render this step as `w-400,h-300,...`.
    #[must_use]
    pub fn to_params(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(w) = self.width {
            parts.push(format!("w-{w}"));
        }
        if let Some(h) = self.height {
            parts.push(format!("h-{h}"));
        }
        if let Some(ar) = &self.aspect_ratio {
            parts.push(format!("ar-{ar}"));
        }
        if let Some(q) = self.quality {
            parts.push(format!("q-{q}"));
        }
        if let Some(c) = &self.crop {
            parts.push(format!("c-{c}"));
        }
        if let Some(cm) = &self.crop_mode {
            parts.push(format!("cm-{cm}"));
        }
        if let Some(fo) = &self.focus {
            parts.push(format!("fo-{fo}"));
        }
        if let Some(f) = &self.format {
            parts.push(format!("f-{f}"));
        }
        if let Some(rt) = self.rotation {
            parts.push(format!("rt-{rt}"));
        }
        if let Some(bl) = self.blur {
            parts.push(format!("bl-{bl}"));
        }
        for (key, value) in &self.extra {
            if value.is_empty() {
                parts.push(key.clone());
            } else {
                parts.push(format!("{key}-{value}"));
            }
        }
        parts.join(",")
    }
}

/// Where transformations are placed in the generated URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationPosition {
    /// As a `tr:` path segment right after the endpoint.
    #[default]
    Path,
    /// As a `tr` query parameter.
    Query,
}

/// Options for [`crate::ImageKit::url`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlOptions {
    /// File path relative to the URL endpoint, e.g. `/destinations/a.jpg`.
    pub path: String,
    /// Transformation chain, applied in order.
    pub transformations: Vec<Transformation>,
    /// Placement of the transformation chain.
    pub position: TransformationPosition,
    /// Extra query parameters.
    pub query: BTreeMap<String, String>,
    /// Sign the URL with the private key.
    pub signed: bool,
    /// Lifetime of a signed URL in seconds. `None` never expires.
    pub expire_seconds: Option<i64>,
}

impl UrlOptions {
    /// Plain options for a path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the transformation chain.
    #[must_use]
    pub fn with_transformations(mut self, transformations: Vec<Transformation>) -> Self {
        self.transformations = transformations;
        self
    }

    /// Request a signed URL that expires after `expire_seconds`.
    #[must_use]
    pub fn signed(mut self, expire_seconds: Option<i64>) -> Self {
        self.signed = true;
        self.expire_seconds = expire_seconds;
        self
    }
}

/// Parse an absolute `http` or `https` URL with a host.
///
/// # Errors
///
/// Returns [`ImageKitError::Url`] if the value does not parse or uses
/// another scheme.
pub fn parse_http_url(raw: &str) -> Result<Url> {
    let parsed =
        Url::parse(raw.trim()).map_err(|e| ImageKitError::Url(format!("invalid URL {raw:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        scheme => Err(ImageKitError::Url(format!(
            "unsupported URL scheme {scheme:?} in {raw:?}"
        ))),
    }
}

/// Build a delivery URL.
///
/// `now` is the current unix time, only used for expiring signatures.
pub(crate) fn build_url(
    url_endpoint: &str,
    private_key: &str,
    options: &UrlOptions,
    now: i64,
) -> Result<String> {
    if options.path.trim().is_empty() {
        return Err(ImageKitError::Url("path must not be empty".to_string()));
    }

    // The signature covers everything after the endpoint prefix.
    let base = parse_http_url(&format!("{}/", url_endpoint.trim().trim_end_matches('/')))?;
    let path = options.path.trim_start_matches('/');

    let chain = options
        .transformations
        .iter()
        .filter(|t| !t.is_empty())
        .map(Transformation::to_params)
        .collect::<Vec<_>>()
        .join(":");

    let relative = if !chain.is_empty() && options.position == TransformationPosition::Path {
        format!("tr:{chain}/{path}")
    } else {
        path.to_string()
    };
    let mut url = base.clone();
    url.set_path(&format!("{}{relative}", base.path()));

    let mut query: Vec<(String, String)> = options
        .query
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !chain.is_empty() && options.position == TransformationPosition::Query {
        query.insert(0, ("tr".to_string(), chain));
    }

    let expiry = match options.expire_seconds {
        Some(secs) if options.signed => {
            if secs <= 0 {
                return Err(ImageKitError::Url(
                    "expire_seconds must be positive".to_string(),
                ));
            }
            let at = now + secs;
            query.push(("ik-t".to_string(), at.to_string()));
            at
        }
        _ => NO_EXPIRY_TIMESTAMP,
    };

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(&query);
    }

    if options.signed {
        let unsigned_part = url
            .as_str()
            .strip_prefix(base.as_str())
            .unwrap_or(url.as_str())
            .to_string();
        let signature = hmac_sha1_hex(private_key, &format!("{unsigned_part}{expiry}"))?;
        url.query_pairs_mut().append_pair("ik-s", &signature);
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "https://ik.imagekit.io/demo";
    const KEY: &str = "private_test_key";

    #[test]
    fn test_plain_url() {
        let url = build_url(ENDPOINT, KEY, &UrlOptions::new("/a/b.jpg"), 0).unwrap();
        assert_eq!(url, "https://ik.imagekit.io/demo/a/b.jpg");
    }

    #[test]
    fn test_trailing_slash_endpoint() {
        let url = build_url("https://ik.imagekit.io/demo/", KEY, &UrlOptions::new("b.jpg"), 0)
            .unwrap();
        assert_eq!(url, "https://ik.imagekit.io/demo/b.jpg");
    }

    #[test]
    fn test_path_transformation() {
        let options = UrlOptions::new("/b.jpg")
            .with_transformations(vec![Transformation::resize(400, 300, 100)]);
        let url = build_url(ENDPOINT, KEY, &options, 0).unwrap();
        assert_eq!(
            url,
            "https://ik.imagekit.io/demo/tr:w-400,h-300,q-100,c-maintain_ratio/b.jpg"
        );
    }

    #[test]
    fn test_chained_transformations() {
        let options = UrlOptions::new("/b.jpg").with_transformations(vec![
            Transformation::width(800, 90),
            Transformation {
                rotation: Some(90),
                ..Transformation::default()
            },
        ]);
        let url = build_url(ENDPOINT, KEY, &options, 0).unwrap();
        assert!(url.contains("/tr:w-800,q-90:rt-90/"));
    }

    #[test]
    fn test_empty_transformation_is_skipped() {
        let options =
            UrlOptions::new("/b.jpg").with_transformations(vec![Transformation::default()]);
        let url = build_url(ENDPOINT, KEY, &options, 0).unwrap();
        assert_eq!(url, "https://ik.imagekit.io/demo/b.jpg");
    }

    #[test]
    fn test_query_position() {
        let mut options =
            UrlOptions::new("/b.jpg").with_transformations(vec![Transformation::width(400, 80)]);
        options.position = TransformationPosition::Query;
        let url = build_url(ENDPOINT, KEY, &options, 0).unwrap();
        assert_eq!(url, "https://ik.imagekit.io/demo/b.jpg?tr=w-400%2Cq-80");
    }

    #[test]
    fn test_extra_parameters() {
        let mut extra = BTreeMap::new();
        extra.insert("e-grayscale".to_string(), String::new());
        let t = Transformation {
            extra,
            ..Transformation::default()
        };
        assert_eq!(t.to_params(), "e-grayscale");
    }

    #[test]
    fn test_signed_url_without_expiry() {
        let options = UrlOptions::new("/b.jpg").signed(None);
        let url = build_url(ENDPOINT, KEY, &options, 1_700_000_000).unwrap();
        let expected = hmac_sha1_hex(KEY, &format!("b.jpg{NO_EXPIRY_TIMESTAMP}")).unwrap();
        assert_eq!(url, format!("https://ik.imagekit.io/demo/b.jpg?ik-s={expected}"));
        assert!(!url.contains("ik-t"));
    }

    #[test]
    fn test_signed_url_with_expiry() {
        let options = UrlOptions::new("/b.jpg").signed(Some(300));
        let url = build_url(ENDPOINT, KEY, &options, 1_700_000_000).unwrap();
        let expected =
            hmac_sha1_hex(KEY, "b.jpg?ik-t=17000003001700000300").unwrap();
        assert_eq!(
            url,
            format!("https://ik.imagekit.io/demo/b.jpg?ik-t=1700000300&ik-s={expected}")
        );
    }

    #[test]
    fn test_signed_url_rejects_non_positive_expiry() {
        let options = UrlOptions::new("/b.jpg").signed(Some(0));
        assert!(build_url(ENDPOINT, KEY, &options, 0).is_err());
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(build_url(ENDPOINT, KEY, &UrlOptions::new("  "), 0).is_err());
    }

    #[test]
    fn test_query_encoding() {
        let mut options = UrlOptions::new("/b.jpg");
        options
            .query
            .insert("v".to_string(), "a b&c".to_string());
        let url = build_url(ENDPOINT, KEY, &options, 0).unwrap();
        assert!(url.ends_with("?v=a+b%26c"));
    }

    #[test]
    fn test_path_is_percent_encoded() {
        let url = build_url(ENDPOINT, KEY, &UrlOptions::new("/Danau Sentarum.jpg"), 0).unwrap();
        assert_eq!(url, "https://ik.imagekit.io/demo/Danau%20Sentarum.jpg");
    }

    #[test]
    fn test_malformed_endpoint_rejected() {
        for endpoint in ["https://", "https://a b", "ftp://ik.imagekit.io/demo", "demo"] {
            assert!(
                matches!(
                    build_url(endpoint, KEY, &UrlOptions::new("/b.jpg"), 0),
                    Err(ImageKitError::Url(_))
                ),
                "accepted {endpoint}"
            );
        }
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://ik.imagekit.io/demo").is_ok());
        assert!(parse_http_url("http://localhost:8080").is_ok());
        assert!(parse_http_url("https://").is_err());
        assert!(parse_http_url("https://a b").is_err());
        assert!(parse_http_url("mailto:a@example.com").is_err());
    }

    #[test]
    fn test_transformation_deserialize_camel_case() {
        let t: Transformation =
            serde_json::from_str(r#"{"width": 400, "aspectRatio": "4-3", "crop": "at_max"}"#)
                .unwrap();
        assert_eq!(t.width, Some(400));
        assert_eq!(t.to_params(), "w-400,ar-4-3,c-at_max");
    }
}
