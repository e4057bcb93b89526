//! Input validation shared by the API layer and by dispatch (defense in
//! depth, since dispatch must not trust any caller other than the API).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("source_id must be a non-empty sequence of letters, digits, '.', '-' or '_'")]
    InvalidSourceId,
    #[error("checksum must be URL-safe base64 (alphabet A-Za-z0-9-_=)")]
    InvalidChecksum,
}

/// `source_id` must be a non-empty sequence of letters/digits/`.-_`.
pub fn validate_source_id(source_id: &str) -> Result<(), ValidationError> {
    if !source_id.is_empty()
        && source_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
    {
        Ok(())
    } else {
        Err(ValidationError::InvalidSourceId)
    }
}

/// `checksum` must be URL-safe base64: `A-Za-z0-9-_=`, non-empty.
pub fn validate_checksum(checksum: &str) -> Result<(), ValidationError> {
    if !checksum.is_empty()
        && checksum
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'='))
    {
        Ok(())
    } else {
        Err(ValidationError::InvalidChecksum)
    }
}

/// When checksum verification is disabled, an otherwise-invalid checksum is
/// re-encoded as an opaque URL-safe base64 identifier instead of being
/// rejected (spec §4.6).
pub fn coerce_checksum(checksum: &str) -> String {
    use base64::{engine::general_purpose::URL_SAFE, Engine as _};
    if validate_checksum(checksum).is_ok() {
        checksum.to_string()
    } else {
        URL_SAFE.encode(checksum.as_bytes())
    }
}

/// The dual equality test from spec §4.2 step 1: a retrieved etag matches
/// the requested checksum either directly, or after URL-safe base64
/// decoding the requested checksum.
pub fn checksum_matches_etag(checksum: &str, etag: &str) -> bool {
    use base64::{engine::general_purpose::URL_SAFE, Engine as _};
    if checksum == etag {
        return true;
    }
    match URL_SAFE.decode(checksum) {
        Ok(decoded) => decoded == etag.as_bytes(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_decimal_source_ids() {
        assert!(validate_source_id("54").is_ok());
    }

    #[test]
    fn rejects_empty_source_id() {
        assert_eq!(validate_source_id(""), Err(ValidationError::InvalidSourceId));
    }

    #[test]
    fn rejects_path_traversal_in_source_id() {
        assert!(validate_source_id("../../etc/passwd").is_err());
    }

    #[test]
    fn accepts_url_safe_base64_checksum() {
        assert!(validate_checksum("a1b2c3d4=").is_ok());
        assert!(validate_checksum("a1-b2_c3").is_ok());
    }

    #[test]
    fn rejects_checksum_with_plus_or_slash() {
        assert!(validate_checksum("a1+b2/c3").is_err());
    }

    #[test]
    fn coerces_invalid_checksum_to_base64() {
        let coerced = coerce_checksum("not valid!!");
        assert!(validate_checksum(&coerced).is_ok());
    }

    #[test]
    fn checksum_matches_etag_direct() {
        assert!(checksum_matches_etag("abc123", "abc123"));
    }

    #[test]
    fn checksum_matches_etag_via_base64_decode() {
        use base64::{engine::general_purpose::URL_SAFE, Engine as _};
        let encoded = URL_SAFE.encode("rawetag");
        assert!(checksum_matches_etag(&encoded, "rawetag"));
    }

    #[test]
    fn checksum_mismatch() {
        assert!(!checksum_matches_etag("abc123", "xyz789"));
    }
}
