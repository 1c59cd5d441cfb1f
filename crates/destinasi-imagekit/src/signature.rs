//! HMAC signing shared by signed URLs and client-side upload parameters.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::error::{ImageKitError, Result};

type HmacSha1 = Hmac<Sha1>;

/// Default lifetime of client upload parameters, in seconds.
pub const DEFAULT_AUTH_EXPIRE_SECONDS: i64 = 60 * 30;

/// Hex-encoded HMAC-SHA1 of `message` keyed with `key`.
///
/// # Errors
///
/// Returns an error if the key cannot initialize the MAC.
pub fn hmac_sha1_hex(key: &str, message: &str) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| ImageKitError::Signature(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Parameters a browser needs to upload straight to ImageKit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationParameters {
    /// Unique token for this upload.
    pub token: String,
    /// Unix time after which the parameters are rejected.
    pub expire: i64,
    /// `hmac_sha1(private_key, token + expire)`.
    pub signature: String,
}

/// Compute upload parameters.
///
/// An empty `token` is replaced by a random UUID and a missing `expire` by
/// `now` plus thirty minutes.
pub(crate) fn authentication_parameters(
    private_key: &str,
    token: Option<&str>,
    expire: Option<i64>,
    now: i64,
) -> Result<AuthenticationParameters> {
    let token = match token {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    };
    let expire = match expire {
        Some(e) if e > 0 => e,
        _ => now + DEFAULT_AUTH_EXPIRE_SECONDS,
    };
    let signature = hmac_sha1_hex(private_key, &format!("{token}{expire}"))?;
    Ok(AuthenticationParameters {
        token,
        expire,
        signature,
    })
}
