//! Perceptual hash comparison.
//!
//! ImageKit returns a 64-bit pHash as 16 hex characters in file metadata.
//! The distance between two images is the Hamming distance of their hashes.

use crate::error::{ImageKitError, Result};

/// Hamming distance between two hex-encoded 64-bit pHash values.
///
/// # Errors
///
/// Returns [`ImageKitError::InvalidPhash`] if either value is empty, longer
/// than 16 hex digits, or not hexadecimal.
pub fn phash_distance(first: &str, second: &str) -> Result<u32> {
    let a = parse(first)?;
    let b = parse(second)?;
    Ok((a ^ b).count_ones())
}

fn parse(value: &str) -> Result<u64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > 16 {
        return Err(ImageKitError::InvalidPhash(value.to_string()));
    }
    u64::from_str_radix(trimmed, 16).map_err(|_| ImageKitError::InvalidPhash(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_hashes() {
        assert_eq!(phash_distance("f06830ca9f1e3e90", "f06830ca9f1e3e90").unwrap(), 0);
    }

    #[test]
    fn test_known_distance() {
        assert_eq!(
            phash_distance("2d5ad3936d2e015b", "2d6ed293db36a4fb").unwrap(),
            17
        );
        assert_eq!(
            phash_distance("a4a65595ac94518b", "7838873e791f8400").unwrap(),
            37
        );
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = "2d5ad3936d2e015b";
        let b = "2d6ed293db36a4fb";
        assert_eq!(phash_distance(a, b).unwrap(), phash_distance(b, a).unwrap());
    }

    #[test]
    fn test_short_hash_is_zero_padded() {
        assert_eq!(phash_distance("1", "0").unwrap(), 1);
    }

    #[test]
    fn test_invalid_hashes() {
        assert!(phash_distance("", "00").is_err());
        assert!(phash_distance("zz", "00").is_err());
        assert!(phash_distance("00000000000000000", "00").is_err());
    }
}
